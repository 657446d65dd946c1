pub mod icons;
pub mod output;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{
    dim, error, format_value, header, info, render_property, section, status, success, summary_row, warn,
};
pub use table::{TableBuilder, file_table, object_table, stats_table};
pub use theme::{Theme, theme};
