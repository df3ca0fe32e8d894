//! Quick reference for moving failures between faultscope and anyhow.
//!
//! # Running this Example
//!
//! ```bash
//! cargo run --example anyhow_interop --features compat-anyhow1
//! ```
//!
//! # Conversion Overview
//!
//! - `.into_faultscope()` turns an `anyhow::Error` or `anyhow::Result<T>` into
//!   something a scope can capture
//! - `.into_anyhow()` and `?` turn a labeled [`Error`] back into an
//!   `anyhow::Error`

use faultscope::{
    Error, Scope,
    compat::{IntoFaultscope, anyhow1::IntoAnyhow},
};

// ============================================================================
// Example 1: Capturing anyhow errors in a scope
// ============================================================================

fn fetch() -> anyhow::Result<String> {
    anyhow::bail!("connection refused");
}

fn scope_calls_anyhow() -> Result<Option<String>, Error> {
    let scope = Scope::new("sync")?;
    scope.run(|scope| scope.child("fetch")?.run(|_| fetch().into_faultscope()))
        .map(Option::flatten)
}

// ============================================================================
// Example 2: Handing labeled failures to anyhow callers
// ============================================================================

fn anyhow_calls_scope() -> anyhow::Result<()> {
    scope_calls_anyhow().into_anyhow()?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    println!("=== Example 1: anyhow -> faultscope ===\n");
    if let Err(error) = scope_calls_anyhow() {
        println!("label: {}", error.label().map(|label| label.as_str()).unwrap_or("-"));
        println!("{error}\n");
    }

    println!("=== Example 2: faultscope -> anyhow ===\n");
    if let Err(error) = anyhow_calls_scope() {
        println!("{error:#}\n");
    }

    Ok(())
}
