//! # Bankpilot Agent
//!
//! The serving path. One `Advisor` per process answers conversation
//! requests: it runs the direct-match lookup and vector retrieval in
//! parallel against the knowledge store, fits history and evidence into
//! the token budget, and calls the generation provider. Every external
//! dependency failure degrades the answer before it is allowed to fail
//! the request; only the final generation call is terminal.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use tracing::warn;

use bankpilot_core::config::BankpilotConfig;
use bankpilot_core::error::{BankpilotError, Result};
use bankpilot_core::traits::{BankDirectory, ChunkStore, Embedder, Generator};
use bankpilot_core::types::{BankEntry, ChatOutcome, ChatReply, GenerateParams, Message};
use bankpilot_knowledge::retriever::{evidence_texts, unique_sources};
use bankpilot_knowledge::{ContextBudgeter, DirectMatcher, Retriever};

/// Deflection lines the model is told not to produce, stripped if it
/// produces them anyway ("For more details, contact...", "Please visit
/// the website for more information.").
static DEFLECTION_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(for|please)\b.+(details|information|more|contact)")
        .expect("valid deflection pattern")
});

static EXTRA_BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid blank-line pattern"));

/// Drop deflection lines and collapse runs of blank lines.
pub fn sanitize_answer(text: &str) -> String {
    let kept: Vec<&str> = text
        .lines()
        .filter(|line| !DEFLECTION_LINE.is_match(line.trim()))
        .collect();
    EXTRA_BLANK_LINES
        .replace_all(&kept.join("\n"), "\n\n")
        .trim()
        .to_string()
}

pub struct Advisor {
    generator: Arc<dyn Generator>,
    retriever: Retriever,
    matcher: DirectMatcher,
    budgeter: ContextBudgeter,
    params: GenerateParams,
    top_n: usize,
    source_cap: usize,
    evidence_char_cap: usize,
}

impl Advisor {
    pub fn new(
        config: &BankpilotConfig,
        generator: Arc<dyn Generator>,
        embedder: Arc<dyn Embedder>,
        chunks: Arc<dyn ChunkStore>,
        directory: Arc<dyn BankDirectory>,
    ) -> Result<Self> {
        let budgeter = ContextBudgeter::new(
            &config.llm.model,
            config.budget.token_ceiling,
            config.budget.user_ceiling,
        )?;
        Ok(Self {
            generator,
            retriever: Retriever::new(embedder, chunks, config.retrieval.window),
            matcher: DirectMatcher::new(directory),
            budgeter,
            params: GenerateParams {
                model: config.llm.model.clone(),
                temperature: config.llm.temperature,
                max_tokens: config.llm.max_tokens,
            },
            top_n: config.retrieval.top_n,
            source_cap: config.retrieval.source_cap,
            evidence_char_cap: config.retrieval.evidence_char_cap,
        })
    }

    /// Answer one conversation. The conversation must be non-empty; the
    /// latest turn's content is the query.
    pub async fn answer(&self, conversation: &[Message]) -> Result<ChatOutcome> {
        let Some(latest) = conversation.last() else {
            return Err(BankpilotError::Config("conversation must not be empty".into()));
        };
        let user_prompt = latest.content.clone();
        let history = &conversation[..conversation.len() - 1];

        // Independent lookups, issued in parallel. Each degrades on its
        // own: no evidence is a worse answer, not a failed request.
        let (direct_list, retrieved) = tokio::join!(
            self.matcher.lookup(&user_prompt),
            self.retriever.retrieve(&user_prompt, self.top_n),
        );
        let ranked = match retrieved {
            Ok(chunks) => chunks,
            Err(e) => {
                warn!("vector retrieval failed: {e}");
                Vec::new()
            }
        };

        let sources = unique_sources(&ranked, self.source_cap);
        let evidence = evidence_texts(&ranked, self.evidence_char_cap);

        let system_text = compose_system_prompt(&direct_list, &sources);
        let selection = self.budgeter.fit(&system_text, &user_prompt, history, &evidence);
        if selection.needs_compression {
            return Ok(ChatOutcome::NeedsCompression);
        }

        let mut messages = Vec::with_capacity(selection.history.len() + 2);
        messages.push(Message::system(format!(
            "{system_text}\n\n--- VECTOR_CONTEXT ---\n{}",
            selection.evidence.join("\n\n")
        )));
        messages.extend(selection.history.iter().cloned());
        messages.push(Message::user(user_prompt));

        // The one terminal failure: there is no fallback answer source.
        let raw = self.generator.generate(&messages, &self.params).await?;
        let text = sanitize_answer(&raw);
        let cited: Vec<String> = sources.into_iter().filter(|url| text.contains(url.as_str())).collect();

        Ok(ChatOutcome::Answer(ChatReply {
            text,
            evidence_used: selection.evidence.len(),
            sources: cited,
        }))
    }
}

fn compose_system_prompt(direct_list: &[BankEntry], sources: &[String]) -> String {
    let direct_json = serde_json::to_string_pretty(direct_list).unwrap_or_else(|_| "[]".into());
    let sources_json = serde_json::to_string_pretty(sources).unwrap_or_else(|_| "[]".into());
    format!(
        "You are a senior banking-advisory assistant.\n\
         \n\
         RULES\n\
         - Answer concisely and definitively.\n\
         - Never tell the user to visit a website or contact support for more information.\n\
         - Include a link only when the user explicitly asks for a source, link, or document.\n\
         - Cite with plain Markdown: [Title](https://...).\n\
         - If the data does not cover the question, say so briefly instead of guessing.\n\
         \n\
         DATA\n\
         - DIRECT_CRYPTO_LIST (json): banks confirmed as crypto-friendly.\n\
         - VECTOR_CONTEXT: factual excerpts from bank documentation.\n\
         - SOURCES: URLs you may cite when asked.\n\
         \n\
         --- DIRECT_CRYPTO_LIST ---\n\
         {direct_json}\n\
         \n\
         --- SOURCES ---\n\
         {sources_json}"
    )
}
