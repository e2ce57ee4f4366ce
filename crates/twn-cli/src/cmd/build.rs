use anyhow::{bail, Context, Result};
use std::fs;
use twn_context::project::{TransformedFile, TwnProject};
use twn_plugin::TwnPlugin;

/// Outcome of a one-shot scan of `src/`.
struct BuildOutput {
    plugin: TwnPlugin,
    files: usize,
    transformed: Vec<TransformedFile>,
}

pub fn run(write: bool) -> Result<()> {
    let project = TwnProject::load_cwd()?;
    let output = build(&project)?;
    let plugin = &output.plugin;

    eprintln!("Scanned {} file(s) in src/", output.files);

    let Some(directive) = plugin.directive() else {
        eprintln!("No twn() classes found.");
        return Ok(());
    };

    if write {
        for file in &output.transformed {
            fs::write(&file.id, &file.code)
                .with_context(|| format!("Failed to write {}", file.id))?;
            eprintln!("  {} <- @source inline", relative(&project, &file.id));
        }
    } else {
        println!("{directive}");
    }

    eprintln!(
        "\n{} class(es) for {}",
        plugin.classes().len(),
        plugin.css_entry().map(|e| relative(&project, e)).unwrap_or_default()
    );
    Ok(())
}

fn build(project: &TwnProject) -> Result<BuildOutput> {
    let files = project.collect_files()?;

    // The output is written directly, no watcher to wake up.
    let mut options = project.config.twn.clone();
    options.touch = false;
    let mut plugin = TwnPlugin::new(options).context("Invalid twn.cssEntryPattern in package.json")?;

    let transformed = project.transform_all(&mut plugin, &files);
    if plugin.css_entry().is_none() {
        bail!("No stylesheet under src/ imports tailwindcss");
    }
    Ok(BuildOutput {
        plugin,
        files: files.len(),
        transformed,
    })
}

fn relative(project: &TwnProject, id: &str) -> String {
    let root = project.root.to_string_lossy().replace('\\', "/");
    id.strip_prefix(root.as_str())
        .unwrap_or(id)
        .trim_start_matches('/')
        .to_string()
}
