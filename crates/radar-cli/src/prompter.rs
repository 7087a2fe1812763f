//! Interactive yes/no prompts on stdin

use std::io::{self, BufRead, Write};

pub struct CliPrompter;

impl CliPrompter {
    /// Ask `message` until the operator answers yes or no.
    ///
    /// End of input counts as "no".
    pub fn confirm(&self, message: &str) -> bool {
        let stdin = io::stdin();
        loop {
            eprint!("{} [y/N] ", message);
            io::stderr().flush().ok();

            let mut line = String::new();
            match stdin.lock().read_line(&mut line) {
                Ok(0) => return false,
                Ok(_) => {}
                Err(_) => {
                    eprintln!("Failed to read input, please try again");
                    continue;
                }
            }
            match parse_answer(&line) {
                Some(answer) => return answer,
                None => eprintln!("Please answer y or n"),
            }
        }
    }
}

/// Empty input defaults to "no"
fn parse_answer(line: &str) -> Option<bool> {
    match line.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => Some(true),
        "" | "n" | "no" => Some(false),
        _ => None,
    }
}
