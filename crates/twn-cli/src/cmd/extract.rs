use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;
use twn_context::project::TwnProject;
use twn_extract::Extractor;

pub fn run(files: &[PathBuf]) -> Result<()> {
    // Inside a project, honour its "twn.extract" settings.
    let options = TwnProject::load_cwd()
        .map(|project| project.config.twn.extract)
        .unwrap_or_default();
    let classes = extract_files(&Extractor::new(options), files)?;

    for class in &classes {
        println!("{class}");
    }
    eprintln!("\n{} class(es) from {} file(s)", classes.len(), files.len());
    Ok(())
}

fn extract_files(extractor: &Extractor, files: &[PathBuf]) -> Result<BTreeSet<String>> {
    let mut classes = BTreeSet::new();
    for path in files {
        let code = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let id = path.to_string_lossy();
        if !twn_extract::is_source_file(&id) {
            tracing::warn!("Skipping {id}: not a .js, .jsx, .ts or .tsx file");
            continue;
        }
        classes.extend(extractor.extract(&code, &id));
    }
    Ok(classes)
}
