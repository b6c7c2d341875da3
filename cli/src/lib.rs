pub mod commands;
pub mod replay;
pub mod state;

use std::io::{BufRead, Write};

/// Prompt and read one line from stdin. `None` once stdin is exhausted.
pub fn readline() -> Result<Option<String>, String> {
    prompt_line(&mut std::io::stdout(), &mut std::io::stdin().lock())
}

/// Write the prompt to `out` and read one line from `input`.
pub fn prompt_line(out: &mut impl Write, input: &mut impl BufRead) -> Result<Option<String>, String> {
    write!(out, "$ ").map_err(|e| e.to_string())?;
    out.flush().map_err(|e| e.to_string())?;
    let mut buffer = String::new();
    let read = input.read_line(&mut buffer).map_err(|e| e.to_string())?;
    if read == 0 {
        return Ok(None);
    }
    Ok(Some(buffer))
}
