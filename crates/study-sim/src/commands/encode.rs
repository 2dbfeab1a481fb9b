use std::error::Error;
use std::fs;
use std::path::PathBuf;

use clap::Args;
use serde_json::Value;
use study_flow::{decode_payload, encode_json};

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// JSON document to encode.
    #[arg(long)]
    pub input: PathBuf,
    /// Require the document to be a complete study payload.
    #[arg(long)]
    pub strict: bool,
}

pub fn run(args: &EncodeArgs) -> Result<(), Box<dyn Error>> {
    let document: Value = serde_json::from_str(&fs::read_to_string(&args.input)?)?;
    let encoded = encode_json(&document)?;
    if args.strict {
        decode_payload(&encoded)?;
    }
    println!("{encoded}");
    Ok(())
}
