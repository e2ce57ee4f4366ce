use anyhow::{Context, Result};
use twn::{FlattenOptions, KeyOrder, SelectorTree};

pub fn run(base: Option<&str>, selectors: Option<&str>, sort: bool) -> Result<()> {
    println!("{}", render(base, selectors, sort)?);
    Ok(())
}

fn render(base: Option<&str>, selectors: Option<&str>, sort: bool) -> Result<String> {
    let tree = match selectors {
        Some(raw) => {
            let value: serde_json::Value =
                serde_json::from_str(raw).context("Invalid --selectors JSON")?;
            Some(SelectorTree::from_json(&value).context("--selectors must be a JSON object")?)
        }
        None => None,
    };
    let options = FlattenOptions {
        key_order: if sort {
            KeyOrder::Alphabetical
        } else {
            KeyOrder::Insertion
        },
        ..Default::default()
    };
    Ok(twn::flatten_with(base, tree.as_ref(), &options).join(" "))
}
