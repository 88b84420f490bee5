use neo4rs::query;
use tracing::{info, warn};

use unileads_common::{Platform, UnileadsError};

use crate::writer::raw_label;
use crate::GraphClient;

/// Run idempotent schema migrations: constraints, indexes.
/// Statements that already exist are ignored.
///
/// `url` deliberately carries a plain index, not a uniqueness constraint:
/// identity is enforced by the MERGE-based upsert, and the legacy dump
/// import must still be able to land rows for the dedup sweep to reconcile.
pub async fn migrate(client: &GraphClient) -> Result<(), UnileadsError> {
    let g = client.inner();

    info!("Running schema migrations...");

    let constraints = ["CREATE CONSTRAINT ON (l:Lead) ASSERT l.id IS UNIQUE"];
    for c in &constraints {
        run_ignoring_exists(g, c).await?;
    }
    info!("Lead id constraint created");

    // Identity + secondary indexes on the canonical collection.
    let lead_indexes = [
        "CREATE INDEX ON :Lead(url)",
        "CREATE INDEX ON :Lead(platform)",
        "CREATE INDEX ON :Lead(username)",
        "CREATE INDEX ON :Lead(scraped_at)",
    ];
    for idx in &lead_indexes {
        run_ignoring_exists(g, idx).await?;
    }
    info!("Lead indexes created");

    // Classification fields reporting tools filter on.
    let classification_indexes = [
        "CREATE INDEX ON :Lead(industry)",
        "CREATE INDEX ON :Lead(company_name)",
        "CREATE INDEX ON :Lead(lead_category)",
        "CREATE INDEX ON :Lead(lead_sub_category)",
        "CREATE INDEX ON :Lead(company_type)",
        "CREATE INDEX ON :Lead(bdr)",
    ];
    for idx in &classification_indexes {
        run_ignoring_exists(g, idx).await?;
    }
    info!("Classification indexes created");

    // Join-key indexes on each platform source collection.
    for platform in Platform::ALL {
        let label = raw_label(platform);
        let raw_indexes = [
            format!("CREATE INDEX ON :{label}(url)"),
            format!("CREATE INDEX ON :{label}(username)"),
            format!("CREATE INDEX ON :{label}(scraped_at)"),
        ];
        for idx in &raw_indexes {
            run_ignoring_exists(g, idx).await?;
        }
    }
    info!("Source collection indexes created");

    info!("Schema migration complete");
    Ok(())
}

/// Run a Cypher statement, ignoring errors that indicate the
/// constraint/index already exists.
async fn run_ignoring_exists(g: &neo4rs::Graph, cypher: &str) -> Result<(), UnileadsError> {
    match g.run(query(cypher)).await {
        Ok(_) => Ok(()),
        Err(e) => {
            let msg = e.to_string().to_lowercase();
            if msg.contains("already exists") || msg.contains("equivalent") {
                warn!(
                    "Already exists (skipped): {}",
                    cypher.chars().take(80).collect::<String>()
                );
                Ok(())
            } else {
                Err(UnileadsError::Database(format!("migration failed: {e}")))
            }
        }
    }
}
