use std::{
    env,
    error::Error,
    fs,
    io::{self, Write},
};

use stlc::{
    interpreter::{render, Interpreter},
    parser,
    token::Spanned,
    type_checker::Checker,
    util::fmt::print_term,
};

fn main() {
    if let Err(error) = run() {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let mut args = env::args().skip(1);

    // File mode
    if let Some(prog_path) = args.next() {
        let input = fs::read_to_string(prog_path)?;
        pipeline(&input);
        return Ok(());
    }

    // Interactive REPL mode
    println!("Enter a term, finish with an empty line, or send Ctrl+D to exit.");

    let mut accumulated_input = String::new();

    loop {
        if accumulated_input.is_empty() {
            print!("> ");
        } else {
            print!("| ");
        }
        io::stdout().flush()?;

        let mut current_line = String::new();
        let n = io::stdin().read_line(&mut current_line)?;

        if n == 0 {
            println!();
            if !accumulated_input.trim().is_empty() {
                pipeline(&accumulated_input);
            }
            return Ok(());
        }

        // An empty line is the other termination signal.
        if current_line.trim().is_empty() {
            if !accumulated_input.trim().is_empty() {
                pipeline(&accumulated_input);
                accumulated_input.clear();
            }
        } else {
            accumulated_input.push_str(&current_line);
        }
    }
}

fn pipeline(src: &str) {
    let term = match parser::parse(src) {
        Ok(term) => term,
        Err(error) => {
            report_error(src, &error);
            return;
        }
    };

    println!("=== AST ===");
    print_term(&mut io::stdout(), 0, &term).unwrap();

    let ty = Checker::new().type_of(&term);
    let normal_form = Interpreter::new().eval(term);

    println!();
    println!("{} : {ty}", render(&normal_form));
}

fn report_error(src: &str, error: &Spanned<parser::Error>) {
    let span = error.span;

    let mut line = 1;
    let mut line_start = 0;
    let mut column = 1;

    for (i, char) in src.char_indices() {
        if i >= span.lo {
            column = i - line_start + 1;
            break;
        }
        if char == '\n' {
            line += 1;
            line_start = i + 1;
        }
    }
    // A span at the very end of the source (e.g. an unexpected EOF) still
    // gets a sensible column.
    if span.lo >= src.len() && !src.is_empty() {
        column = src.len() - line_start + 1;
    }

    eprintln!("Error (line {line}, col {column}): {error}");

    if let Some(line_content) = src.lines().nth(line - 1) {
        eprintln!("{line:>4} | {line_content}");
        let indicator_padding = column.saturating_sub(1);
        let indicator_len = std::cmp::max(1, span.len as usize);
        eprintln!(
            "{:>4} | {}{}",
            "",
            " ".repeat(indicator_padding),
            "^".repeat(indicator_len)
        );
    }
}
