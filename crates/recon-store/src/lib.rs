mod breaks;
mod db;
mod predictions;
mod runs;
mod trades;

pub use breaks::insert_break_in_tx;
pub use db::ReconDb;
pub use trades::{persist_normalization, set_trade_matched};
