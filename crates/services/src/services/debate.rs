//! Debate generation and refutation over the LLM gateway.

use db::models::{
    argument::{ArgumentNode, ArgumentTree, Side, SourceRef, TreeError},
    debate::Debate,
};
use serde::Deserialize;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use super::gateway::{GatewayClient, GatewayError, Message};

const ARGUMENTS_PER_SIDE: usize = 3;

#[derive(Debug, Error)]
pub enum DebateError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Tree(#[from] TreeError),
    #[error("debate not found")]
    NotFound,
    #[error("statement must not be empty")]
    EmptyStatement,
    #[error("stored argument tree is unreadable: {0}")]
    CorruptTree(String),
}

/// Root arguments returned by the generation prompt.
#[derive(Debug, Clone, Deserialize)]
struct GeneratedArguments {
    #[serde(rename = "for", default)]
    supporting: Vec<GeneratedArgument>,
    #[serde(default)]
    against: Vec<GeneratedArgument>,
}

#[derive(Debug, Clone, Deserialize)]
struct GeneratedArgument {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    subheading: Option<String>,
    text: String,
    #[serde(default)]
    sources: Vec<GeneratedSource>,
}

#[derive(Debug, Clone, Deserialize)]
struct GeneratedSource {
    title: String,
    url: String,
}

impl GeneratedArgument {
    fn into_node(self) -> ArgumentNode {
        ArgumentNode {
            title: self.title,
            subheading: self.subheading,
            text: self.text,
            sources: self
                .sources
                .into_iter()
                .map(|s| SourceRef {
                    title: s.title,
                    url: s.url,
                })
                .collect(),
            refutations: Vec::new(),
        }
    }
}

/// Service for generating debates and appending refutations.
#[derive(Clone)]
pub struct DebateService {
    pool: SqlitePool,
    gateway: GatewayClient,
}

impl DebateService {
    pub fn new(pool: SqlitePool, gateway: GatewayClient) -> Self {
        Self { pool, gateway }
    }

    /// Generate the initial argument tree for a statement and persist it.
    pub async fn generate(&self, statement: &str) -> Result<Debate, DebateError> {
        let statement = statement.trim();
        if statement.is_empty() {
            return Err(DebateError::EmptyStatement);
        }

        let messages = vec![
            Message::system(GENERATION_SYSTEM_PROMPT),
            Message::user(generation_prompt(statement)),
        ];
        let generated: GeneratedArguments = self.gateway.ask_json(messages, Some(4096)).await?;
        let tree = build_tree(generated);

        let debate = Debate::create(&self.pool, Uuid::new_v4(), statement, &tree).await?;
        info!(
            debate_id = %debate.id,
            for_count = tree.supporting.len(),
            against_count = tree.against.len(),
            "generated debate"
        );
        Ok(debate)
    }

    /// Generate a counterargument against the node at `path` and append it.
    ///
    /// The path is resolved against the row as freshly loaded, not against
    /// whatever snapshot the caller was looking at, so overlapping requests
    /// can never clobber an append that landed in between. A path the
    /// current tree no longer satisfies surfaces as `TreeError::NotFound`.
    pub async fn refute(
        &self,
        id: Uuid,
        side: Side,
        path: &[usize],
    ) -> Result<Debate, DebateError> {
        let debate = Debate::find_by_id(&self.pool, id)
            .await?
            .ok_or(DebateError::NotFound)?;
        let tree = debate
            .parsed_tree()
            .map_err(|e| DebateError::CorruptTree(e.to_string()))?;

        let target_text = tree.resolve(side, path)?.text.clone();
        // The node at depth (path.len() - 1) argues some side; its
        // refutation argues the opposite.
        let refutation_side = side.at_depth(path.len() - 1).opposite();

        let messages = vec![
            Message::system(REFUTATION_SYSTEM_PROMPT),
            Message::user(refutation_prompt(
                &debate.statement,
                &target_text,
                refutation_side,
            )),
        ];
        let generated: GeneratedArgument = self.gateway.ask_json(messages, Some(1024)).await?;
        let node = generated.into_node();

        // Apply against the row as it stands now, not the snapshot the
        // prompt was built from: another append may have landed while the
        // gateway ran. The tree only grows, so the path stays valid.
        let mut tx = self.pool.begin().await?;
        let current = Debate::find_by_id(&mut *tx, id)
            .await?
            .ok_or(DebateError::NotFound)?;
        let current_tree = current
            .parsed_tree()
            .map_err(|e| DebateError::CorruptTree(e.to_string()))?;
        let updated = current_tree.append_child(side, path, node)?;
        let debate = Debate::update_tree(&mut *tx, id, &updated).await?;
        tx.commit().await?;

        info!(debate_id = %id, side = %side, ?path, "appended refutation");
        Ok(debate)
    }
}

fn build_tree(generated: GeneratedArguments) -> ArgumentTree {
    let mut tree = ArgumentTree::default();
    for argument in generated.supporting {
        tree = tree.append_root(Side::For, argument.into_node());
    }
    for argument in generated.against {
        tree = tree.append_root(Side::Against, argument.into_node());
    }
    tree
}

const GENERATION_SYSTEM_PROMPT: &str = "You are a rigorous, neutral debate writer. \
    Always reply with strict JSON and nothing else.";

const REFUTATION_SYSTEM_PROMPT: &str = "You are a rigorous debate writer producing a single \
    counterargument. Always reply with strict JSON and nothing else.";

fn generation_prompt(statement: &str) -> String {
    format!(
        "STATEMENT: {statement}\n\
         Produce {n} arguments supporting the statement and {n} opposing it. \
         Reply with JSON of the shape \
         {{\"for\": [{{\"title\", \"subheading\", \"text\", \"sources\": [{{\"title\", \"url\"}}]}}], \"against\": [...]}}. \
         Each argument needs a short title, a one-sentence subheading, a substantive text, \
         and 1-3 reputable sources.",
        statement = statement,
        n = ARGUMENTS_PER_SIDE,
    )
}

fn refutation_prompt(statement: &str, target: &str, refutation_side: Side) -> String {
    let stance = match refutation_side {
        Side::For => "supports",
        Side::Against => "opposes",
    };
    format!(
        "STATEMENT: {statement}\n\
         ARGUMENT TO REFUTE: {target}\n\
         Write one direct refutation of the argument above. Your refutation {stance} the \
         statement. Reply with JSON of the shape \
         {{\"title\", \"subheading\", \"text\", \"sources\": [{{\"title\", \"url\"}}]}}.",
        statement = statement,
        target = target,
        stance = stance,
    )
}
