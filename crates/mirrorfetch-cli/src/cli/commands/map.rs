//! `mirrorfetch map` – print candidate URLs in the order they would be tried.

use anyhow::Result;
use mirrorfetch_core::config::MirrorfetchConfig;

pub fn run_map(cfg: &MirrorfetchConfig, urls: &[String]) -> Result<()> {
    let table = cfg.mirror_table();
    let delays = cfg.source_delays();
    for url in urls {
        let content = table.content_kind(url, cfg);
        let policy = mirrorfetch_core::sources::effective_policy(cfg.preference, content);
        let stagger = delays.for_policy(policy);
        println!("{}", url);
        for (i, (tag, candidate)) in table.tagged_candidates(url, cfg).into_iter().enumerate() {
            let delay = if i == 0 { stagger.primary } else { stagger.secondary };
            println!("  {}. [{}] +{}ms {}", i + 1, tag, delay.as_millis(), candidate);
        }
    }
    if urls.len() > 1 {
        println!("combined:");
        for candidate in table.map_urls(urls, cfg) {
            println!("  {}", candidate);
        }
    }
    Ok(())
}
