//! Pipe command implementation.

use rollfile::{new_writer_from_config, Config, RollingWriter, WriterOption};
use std::io::{self, BufRead};
use tracing::info;

/// Runs the pipe command, copying stdin into a rotating writer.
pub fn run(mut config: Config, options: Vec<WriterOption>) -> Result<(), Box<dyn std::error::Error>> {
    for option in options {
        option.apply(&mut config);
    }

    let writer = new_writer_from_config(config)?;
    info!(path = %writer.path().display(), mode = %writer.mode(), "piping stdin");

    let copied = copy_lines(io::stdin().lock(), writer.as_ref());
    // Close even when the copy failed so accepted bytes reach the file.
    let closed = writer.close();

    let lines = copied?;
    closed?;
    info!(lines, "input closed");
    Ok(())
}

/// Copies `input` into `writer` line by line, keeping line terminators.
///
/// Returns the number of lines copied. A final line without a terminator is
/// copied as is.
pub fn copy_lines(
    mut input: impl BufRead,
    writer: &dyn RollingWriter,
) -> Result<u64, Box<dyn std::error::Error>> {
    let mut line = Vec::new();
    let mut lines = 0u64;
    loop {
        line.clear();
        if input.read_until(b'\n', &mut line)? == 0 {
            return Ok(lines);
        }
        writer.write(&line)?;
        lines += 1;
    }
}
