pub mod json;
pub mod table;

use serde::Serialize;

/// Print `value` as JSON or through its table renderer.
pub fn print<T: Serialize>(value: &T, json_output: bool, table: impl FnOnce(&T) -> String) {
    if json_output {
        println!("{}", json::render(value));
    } else {
        print!("{}", table(value));
    }
}
