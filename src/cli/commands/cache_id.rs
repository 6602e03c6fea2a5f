//! Cache-id command - print the stable id for a cache mount

use crate::cli::args::CacheIdArgs;
use crate::config::Config;
use crate::error::{StagecraftError, StagecraftResult};
use crate::instruction::cache_id;

/// Execute the cache-id command
pub async fn execute(args: CacheIdArgs, _config: &Config) -> StagecraftResult<()> {
    let dir = match args.dir {
        Some(dir) => dir,
        None => std::env::current_dir()
            .map_err(|e| StagecraftError::io("getting current directory", e))?,
    };

    println!("{}", cache_id(&dir, &args.target));
    Ok(())
}
