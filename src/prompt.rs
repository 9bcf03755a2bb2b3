//! Operator-facing terminal text.

use colored::Colorize;
use std::io::{self, BufRead, Write};
use std::path::Path;

pub const REMAP_PROMPT: &str = "Remap clipboard input file [CTRL-C to exit]: ";

const POLICY_WARNING: &str =
    "Obfuscated data in the airlock may violate the airlock usage policy.";

/// Print the remap prompt without a trailing newline.
pub fn show_remap_prompt() {
    let mut stdout = io::stdout().lock();
    let _ = write!(stdout, "\n{}", REMAP_PROMPT.bold());
    let _ = stdout.flush();
}

/// Ask whether to continue with an obfuscation key configured.
///
/// Repeats until the answer is yes or no. End of input counts as no.
pub fn confirm_obfuscation<R: BufRead, W: Write>(input: &mut R, out: &mut W) -> io::Result<bool> {
    loop {
        write!(
            out,
            "\n{}\nDo you still want to continue? [y/n]: ",
            POLICY_WARNING.yellow()
        )?;
        out.flush()?;

        let mut answer = String::new();
        if input.read_line(&mut answer)? == 0 {
            return Ok(false);
        }

        match answer.trim().to_ascii_lowercase().as_str() {
            "y" | "yes" => return Ok(true),
            "n" | "no" => return Ok(false),
            other => writeln!(out, "Unrecognized input: {}", other)?,
        }
    }
}

/// Startup banner, including the command line the peer should run.
pub fn banner(program: &str, input: &Path, output: &Path, keyed: bool) -> String {
    format!(
        "Starting local server : pid={} in={} out={} key={}\n\
         To start remote server: {} {} {}{}\n\n\
         CTRL-C to remap the input file",
        std::process::id(),
        input.display(),
        output.display(),
        if keyed { "<set>" } else { "None" },
        program,
        output.display(),
        input.display(),
        if keyed { " <key>" } else { "" },
    )
}
