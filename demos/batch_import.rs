//! Importing a batch of files without stopping at the first broken one.
//!
//! This example demonstrates:
//! 1. A root scope collecting the failures of many child scopes
//! 2. Details inherited from the root and added per file
//! 3. A handler that ignores some failures and propagates others
//!
//! # Running this Example
//!
//! ```bash
//! cargo run --example batch_import
//! ```

use faultscope::{Handler, hooks::builtin_hooks::console::ConsoleSink, prelude::*};

#[derive(Debug, thiserror::Error)]
enum ImportError {
    #[error("line {0} is not valid CSV")]
    Malformed(usize),
    #[error("file is empty")]
    Empty,
    #[error("disk is gone")]
    Fatal,
}

fn parse(contents: &str) -> Result<usize, ImportError> {
    if contents.is_empty() {
        return Err(ImportError::Empty);
    }
    match contents.lines().position(|line| !line.contains(',')) {
        Some(index) => Err(ImportError::Malformed(index + 1)),
        None => Ok(contents.lines().count()),
    }
}

/// Each file gets its own child scope. A broken file is collected at the
/// root and the loop moves on.
fn import(root: &Scope<'_>, files: &[(&'static str, &str)]) -> Result<usize, Error> {
    let mut imported = 0;
    for (index, (name, contents)) in files.iter().enumerate() {
        let step = root
            .derive(&format!("file[{index}]"))
            .detail("name", *name)
            .build()?;
        if let Some(rows) = step.run(|_| parse(contents))? {
            imported += rows;
        }
    }
    Ok(imported)
}

fn main() -> Result<(), Error> {
    let files = [
        ("a.csv", "id,name\n1,alpha"),
        ("b.csv", ""),
        ("c.csv", "id,name\nbroken"),
        ("d.csv", "id,name\n2,beta\n3,gamma"),
    ];

    println!("=== Collect and print every failure ===\n");
    let root = Scope::builder("import")
        .handler(ConsoleSink::PLAIN.into_handler())
        .detail("batch", 1)
        .build()?;
    let imported = root.run(|root| import(root, &files))?;
    println!("\nimported {} rows\n", imported.unwrap_or_default());

    println!("=== Ignore empty files, propagate fatal errors ===\n");
    let handler = Handler::console()
        .ignore(Filter::error_where(|error: &ImportError| {
            matches!(error, ImportError::Empty)
        }))
        .propagate(Filter::error_where(|error: &ImportError| {
            matches!(error, ImportError::Fatal)
        }));
    let root = Scope::builder("import").handler(handler).build()?;
    let result = root.run(|root| {
        import(root, &files)?;
        root.child("finish")?.run(|_| Err::<(), _>(ImportError::Fatal))
    });
    if let Err(error) = result {
        println!("\nraised: {error}");
    }

    Ok(())
}
