pub mod codec;
pub mod packed;

pub use codec::{decode, decode_all, decode_hex, encode, encode_bytes, TELEGRAM_LEN};
pub use packed::{PackedFlags, PackedReading};
