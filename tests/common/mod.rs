use std::fs::File;
use std::io::{Error, Write};
use std::path::Path;

pub const HEADER: &str = "op, order, product, quantity, price, value, name, email";

/// Writes an operation script with the standard header.
pub fn write_script(path: &Path, rows: &[&str]) -> Result<(), Error> {
    let mut file = File::create(path)?;
    writeln!(file, "{HEADER}")?;
    for row in rows {
        writeln!(file, "{row}")?;
    }
    Ok(())
}

/// Generates a script that seeds one product and creates `orders` one-line
/// orders against it.
pub fn generate_bulk_script(path: &Path, orders: usize) -> Result<(), Error> {
    let mut file = File::create(path)?;
    writeln!(file, "{HEADER}")?;
    writeln!(file, "product, , 1, {}, 10.00, 0, Widget,", orders + 1)?;
    for i in 0..orders {
        writeln!(file, "create, , 1, 1, , , Customer {i}, c{i}@example.com")?;
    }
    file.flush()?;
    Ok(())
}
