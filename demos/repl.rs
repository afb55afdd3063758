use malrs::ast::{Function, Value};
use malrs::env::Env;
use malrs::evaluator;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::panic;
use std::process;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() {
    init_tracing();

    let result = panic::catch_unwind(|| {
        run_repl();
    });

    if let Err(panic_info) = result {
        eprintln!("The REPL encountered an unexpected error and must exit.");

        if let Some(msg) = panic_info.downcast_ref::<&str>() {
            eprintln!("Error: {msg}");
        } else if let Some(msg) = panic_info.downcast_ref::<String>() {
            eprintln!("Error: {msg}");
        } else {
            eprintln!("Error: Unknown panic occurred");
        }

        process::exit(1);
    }
}

/// `RUST_LOG` wins; otherwise `DEBUG=1` or `DEBUG=true` turns on debug output.
fn init_tracing() {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if matches!(std::env::var("DEBUG").as_deref(), Ok("1" | "true")) {
        EnvFilter::new("malrs=debug")
    } else {
        return;
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_level(true))
        .with(filter)
        .init();
}

fn run_repl() {
    println!("malrs - a small Lisp");
    println!("Enter forms like: (+ 1 2)");
    println!("Type :help for more commands, or Ctrl+C to exit.");
    println!();

    let mut rl = DefaultEditor::new().expect("Could not initialize REPL");
    let env = match evaluator::create_global_env() {
        Ok(env) => env,
        Err(e) => {
            eprintln!("{}: {e}", e.name());
            process::exit(1);
        }
    };

    loop {
        match rl.readline("user> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                match line {
                    ":help" => {
                        print_help();
                        continue;
                    }
                    ":env" => {
                        print_environment(&env);
                        continue;
                    }
                    ":quit" | ":exit" => {
                        println!("Goodbye!");
                        break;
                    }
                    _ => {}
                }

                match malrs::rep(line, &env) {
                    Ok(output) if output.is_empty() => {}
                    Ok(output) => println!("{output}"),
                    Err(e) => println!("{}: {e}", e.name()),
                }
            }

            Err(ReadlineError::Eof) | Err(ReadlineError::Interrupted) => {
                println!("Goodbye!");
                break;
            }
            Err(err) => {
                println!("Error: {err:?}");
                break;
            }
        }
    }
}

fn print_help() {
    println!("Commands:");
    println!("  :help      - Show this help message");
    println!("  :env       - Show current environment bindings");
    println!("  :quit      - Exit the interpreter");
    println!("  :exit      - Exit the interpreter");
    println!("  Ctrl+C     - Exit the interpreter");
    println!();
    println!("Special forms: def! let* do if fn* quote");
    println!();
    println!("Literals:");
    println!("  Numbers: 42, -5");
    println!("  Strings: \"a\\nb\"   Keywords: :k   nil true false");
    println!("  Lists (1 2)  Vectors [1 2]  Maps {{:a 1 \"b\" 2}}");
    println!();
    println!("Examples:");
    println!("  (+ 1 (* 2 3))");
    println!("  (def! double (fn* (n) (* n 2)))");
    println!("  (let* (x 1 y (+ x 1)) [x y])");
    println!("  ((fn* (& xs) (count xs)) 1 2 3)");
    println!();
}

fn print_environment(env: &Env) {
    let bindings = env.get_all_bindings();

    if bindings.is_empty() {
        println!("Environment is empty.");
        return;
    }

    println!("Environment bindings ({} total):", bindings.len());
    println!();

    let mut builtins = Vec::new();
    let mut user_defined = Vec::new();

    for (name, value) in bindings {
        match &value {
            Value::Function(f) if matches!(**f, Function::Builtin { .. }) => builtins.push(name),
            _ => user_defined.push((name, value)),
        }
    }

    if !builtins.is_empty() {
        println!("Built-in functions ({}):", builtins.len());
        let mut col = 0;
        for name in builtins {
            print!("  {name:<15}");
            col += 1;
            if col % 4 == 0 {
                println!();
            }
        }
        if col % 4 != 0 {
            println!();
        }
        println!();
    }

    if !user_defined.is_empty() {
        println!("User-defined values ({}):", user_defined.len());
        for (name, value) in user_defined {
            println!("  {name} = {value}");
        }
    }
}
