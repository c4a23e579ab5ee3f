pub mod footer;
pub mod header;
pub mod query;
pub mod utils;

pub use footer::draw_footer;
pub use header::draw_header;
pub use query::{error_line, loading_line, query_lines, LOADING_TEXT};
pub use utils::{fit, truncate};
