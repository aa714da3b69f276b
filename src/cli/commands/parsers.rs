//! Parsers Command
//!
//! Lists the registered source types and what each parser extracts.
//!
//! Usage:
//!   apidocgen parsers [-f json]

use std::fmt::Write;

use crate::cli::util::to_json;
use crate::parser::ParserRegistry;
use crate::types::Result;

pub fn run(format: &str) -> Result<()> {
    let registry = ParserRegistry::with_defaults()?;
    let capabilities = registry.capabilities();

    if format == "json" {
        println!("{}", to_json(&capabilities, false)?);
        return Ok(());
    }

    println!("{}", render_table(&registry));
    Ok(())
}

fn render_table(registry: &ParserRegistry) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:<10} {:<28} {:<8} Extensions", "Type", "Parser", "Schemas");
    for (tag, caps) in registry.capabilities() {
        let _ = writeln!(
            out,
            "{:<10} {:<28} {:<8} {}",
            tag,
            caps.name,
            if caps.extracts_schemas { "yes" } else { "no" },
            caps.extensions.join(", ")
        );
    }
    out.truncate(out.trim_end().len());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_lists_every_type() {
        let registry = ParserRegistry::with_defaults().unwrap();
        let table = render_table(&registry);
        for tag in registry.supported_types() {
            assert!(
                table.lines().any(|line| line.starts_with(&tag)),
                "{tag} missing"
            );
        }
        assert_eq!(table.lines().count(), registry.supported_types().len() + 1);
    }
}
