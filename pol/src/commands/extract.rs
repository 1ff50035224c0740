use anyhow::Result;
use std::path::Path;

use super::load_chain;
use crate::rebuild::BlockSource;
use crate::tag::extract_tag;

/// Print the miner tag carried by each block of a chain file
pub fn run(chain_path: &Path) -> Result<()> {
    let chain = load_chain(chain_path)?;

    let Some(tip) = chain.tip_height() else {
        println!("Chain is empty");
        return Ok(());
    };

    for height in 0..=tip {
        match chain.read_block(height) {
            Ok(block) => match extract_tag(&block) {
                Some(tag) => println!("{height:>8}  {tag}  ({} bytes)", tag.len()),
                None => println!("{height:>8}  -"),
            },
            Err(e) => println!("{height:>8}  ({e})"),
        }
    }

    Ok(())
}
