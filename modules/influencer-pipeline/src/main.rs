use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use brave_client::BraveClient;
use heygen_client::HeyGenClient;
use influencer_common::Config;
use influencer_pipeline::{
    catalog_sync, descriptions::{self, GroqDescriber}, image_resolver::ImageResolver,
    matcher::{self, VisionMatcher, WORKER_COUNT}, research::{self, Researcher}, seeder,
    store::SupabaseStore,
};
use supabase_client::SupabaseClient;

#[derive(Parser)]
#[command(name = "influencer-pipeline", about = "Influencer enrichment batch jobs")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Insert the bundled influencer catalog
    Seed,
    /// Mirror the HeyGen avatar catalog into the avatars table
    SyncAvatars,
    /// Find a profile picture for influencers without one
    ResolveImages,
    /// Describe avatars that have no description yet
    DescribeAvatars,
    /// Match influencers without an avatar to the closest avatar
    MatchAvatars,
    /// Research influencers without research, or one influencer given by name and link
    Research {
        #[arg(long, requires = "link")]
        name: Option<String>,
        #[arg(long, requires = "name")]
        link: Option<String>,
    },
}

/// Workspace crates logged at info level unless RUST_LOG says otherwise.
const LOG_TARGETS: &[&str] = &[
    "influencer",
    "ai_client",
    "heygen_client",
    "brave_client",
    "supabase_client",
];

fn log_filter(base: EnvFilter) -> Result<EnvFilter> {
    LOG_TARGETS
        .iter()
        .try_fold(base, |filter, target| -> Result<EnvFilter> {
            Ok(filter.add_directive(format!("{target}=info").parse()?))
        })
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::from_filename(".env.local").ok();
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(log_filter(EnvFilter::from_default_env())?)
        .init();

    let cli = Cli::parse();

    let config = Config::from_env()?;
    config.log_redacted();

    let store = SupabaseStore::new(SupabaseClient::new(
        &config.supabase_url,
        &config.supabase_service_key,
    ));

    match cli.command {
        Command::Seed => {
            let count = seeder::seed(&store, seeder::INFLUENCER_CATALOG).await?;
            info!(count, "Seeding finished");
        }
        Command::SyncAvatars => {
            let heygen = HeyGenClient::new(config.heygen_api_key()?.to_string());
            let count = catalog_sync::sync_avatars(&heygen, &store).await?;
            info!(count, "Avatar sync finished");
        }
        Command::ResolveImages => {
            let brave = BraveClient::new(config.brave_api_key()?);
            let stats = ImageResolver::new(&brave, &store).run().await?;
            info!(%stats, "Image resolution finished");
        }
        Command::DescribeAvatars => {
            let describer = GroqDescriber::new(config.groq_api_key()?);
            let stats = descriptions::describe_pending(&store, &describer).await?;
            info!(described = stats.described, "Avatar descriptions finished");
        }
        Command::MatchAvatars => {
            let api_key = config.openai_api_key()?.to_string();
            let stats =
                matcher::match_avatars(&store, || VisionMatcher::new(&api_key), WORKER_COUNT)
                    .await?;
            info!(matched = stats.matched, failed = stats.failed, "Avatar matching finished");
        }
        Command::Research { name, link } => {
            let researcher = Researcher::perplexity(config.perplexity_api_key()?);
            match (name, link) {
                (Some(name), Some(link)) => {
                    let record = researcher.research(&name, &link).await?;
                    println!("{}", serde_json::to_string_pretty(&record)?);
                }
                _ => {
                    let stats = research::research_pending(&store, &researcher).await?;
                    info!(researched = stats.researched, "Research finished");
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_covers_every_client_crate() {
        let rendered = log_filter(EnvFilter::new("warn")).unwrap().to_string();
        for target in [
            "influencer",
            "ai_client",
            "heygen_client",
            "brave_client",
            "supabase_client",
        ] {
            assert!(
                rendered.contains(&format!("{target}=info")),
                "{target} missing from {rendered}"
            );
        }
    }
}
