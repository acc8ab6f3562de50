pub mod claude;
pub mod util;

pub use claude::Claude;
pub use util::{extract_fenced_block, truncate_to_char_boundary};
