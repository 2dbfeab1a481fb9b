use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use study_core::StudyConfig;
use study_flow::phase_chain;

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Study configuration (YAML or JSON).
    #[arg(long)]
    pub config: PathBuf,
}

pub fn run(args: &CheckArgs) -> Result<(), Box<dyn Error>> {
    let config = StudyConfig::load(&args.config)?;
    print!("{}", summarize(&config));
    Ok(())
}

pub fn summarize(config: &StudyConfig) -> String {
    let mut out = String::new();
    out.push_str(&format!("study: {} ({})\n", config.study.id, config.study.title));
    out.push_str(&format!(
        "design: {:?}, categories {:?}, blocking {:?}, rating {:?}\n",
        config.design.kind,
        config.design.category_order,
        config.design.dv_blocking,
        config.design.rating_mode
    ));
    out.push_str(&format!("categories ({}):\n", config.categories.len()));
    for category in &config.categories {
        out.push_str(&format!("  {} -> {}\n", category.label, category.key));
    }
    out.push_str(&format!(
        "dependent variables ({}):\n",
        config.dependent_variables.len()
    ));
    for dv in &config.dependent_variables {
        out.push_str(&format!(
            "  {} \"{}\" [{}..{}]\n",
            dv.id,
            dv.display_label(),
            dv.scale_min,
            dv.scale_max
        ));
    }
    let blocks = config.dependent_variables.len().min(2);
    let chain: Vec<&str> = phase_chain(config, blocks)
        .iter()
        .map(|phase| phase.name())
        .collect();
    out.push_str(&format!("phases: {}\n", chain.join(" -> ")));
    out
}
