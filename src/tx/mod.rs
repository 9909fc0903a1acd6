pub mod attribution;
pub mod parser;

pub use attribution::{attribute, Attribution};
pub use parser::{parse_wallet_effect, WalletTxEffect};
