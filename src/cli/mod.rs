pub mod commands;
pub mod util;

pub use util::{CommandContext, parse_json_arg};
