use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use docchat_rag::groq::DEFAULT_GROQ_MODEL;

/// Base URL of a local text-embeddings server, e.g. one serving `all-MiniLM-L6-v2`.
pub const DEFAULT_EMBEDDING_BASE_URL: &str = "http://localhost:8080/v1";

#[derive(Parser)]
#[command(name = "docchat", version, about = "Chat with a folder of documents")]
pub struct Cli {
    /// Index artifact path (overrides INDEX_PATH)
    #[arg(long, global = true)]
    pub index: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(flatten)]
    pub embedding: EmbeddingArgs,

    #[command(flatten)]
    pub generation: GenerationArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Chunk and embed documents, then write the index
    Build {
        /// Directory whose text files are indexed
        #[arg(long)]
        dir: Option<PathBuf>,

        /// Individual files to index
        files: Vec<PathBuf>,
    },

    /// Ask a single question against the index
    Ask {
        /// The question
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },

    /// Interactive chat against the index
    Chat {
        /// Append the session transcript to this JSON log on exit
        #[arg(long)]
        log: Option<PathBuf>,
    },
}

#[derive(Args)]
pub struct EmbeddingArgs {
    /// Bearer token for the embedding endpoint (empty for local servers)
    #[arg(long, env = "EMBEDDING_API_KEY", default_value = "", hide_env_values = true)]
    pub embedding_api_key: String,

    /// OpenAI-compatible base URL of the embedding server serving EMBEDDING_MODEL
    #[arg(long, env = "EMBEDDING_BASE_URL", default_value = DEFAULT_EMBEDDING_BASE_URL)]
    pub embedding_base_url: String,

    /// Output dimensionality of the embedding model
    #[arg(long, env = "EMBEDDING_DIMENSIONS", default_value_t = 384)]
    pub embedding_dimensions: usize,
}

#[derive(Args)]
pub struct GenerationArgs {
    /// Groq API key (required for ask and chat)
    #[arg(long, env = "GROQ_API_KEY", hide_env_values = true)]
    pub groq_api_key: Option<String>,

    /// Chat model
    #[arg(long, env = "GROQ_MODEL", default_value = DEFAULT_GROQ_MODEL)]
    pub groq_model: String,

    /// OpenAI-compatible base URL of the chat server
    #[arg(long, env = "GROQ_BASE_URL", default_value = "https://api.groq.com/openai/v1")]
    pub groq_base_url: String,
}

/// Join `base` and `path`, leaving `base` alone if it already names the endpoint.
pub fn endpoint(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    if base.ends_with(path) { base.to_string() } else { format!("{base}/{path}") }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn endpoint_appends_path_once() {
        assert_eq!(
            endpoint("https://api.groq.com/openai/v1/", "chat/completions"),
            "https://api.groq.com/openai/v1/chat/completions"
        );
        assert_eq!(
            endpoint("http://localhost:8080/v1/embeddings", "embeddings"),
            "http://localhost:8080/v1/embeddings"
        );
    }

    #[test]
    fn embedding_base_url_defaults_to_a_local_server() {
        let command = Cli::command();
        let arg = command.get_arguments().find(|a| a.get_id() == "embedding_base_url").unwrap();
        let defaults: Vec<String> =
            arg.get_default_values().iter().map(|v| v.to_string_lossy().into_owned()).collect();

        assert_eq!(defaults, vec![DEFAULT_EMBEDDING_BASE_URL.to_string()]);
        assert_eq!(endpoint(&defaults[0], "embeddings"), "http://localhost:8080/v1/embeddings");
    }

    #[test]
    fn ask_joins_words_into_question() {
        let cli = Cli::try_parse_from(["docchat", "ask", "what", "is", "rust"]).unwrap();
        match cli.command {
            Command::Ask { question } => assert_eq!(question.join(" "), "what is rust"),
            _ => panic!("expected ask"),
        }
    }
}
