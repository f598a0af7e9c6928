use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use fibot_ai::chunking::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use fibot_ai::llm::fallback::DEFAULT_ADVISOR_MODELS;
use fibot_ai::ollama::DEFAULT_OLLAMA_URL;
use fibot_ai::retrieve::DEFAULT_TOP_K;

#[derive(Parser, Debug)]
#[command(name = "fibot", version, about = "Personal-finance assistant: ledger, goals, budget review and finance Q&A")]
pub struct Cli {
    #[command(flatten)]
    pub config: ConfigArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    /// Gemini API key (required for advisor, budget, insights and NLU commands)
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true, global = true)]
    pub gemini_api_key: Option<String>,

    /// Model used for budget, insights and NLU analyses
    #[arg(long, env = "FIBOT_GEMINI_MODEL", default_value = "gemini-2.5-flash", global = true)]
    pub gemini_model: String,

    /// Advisor models in preference order
    #[arg(
        long,
        env = "FIBOT_ADVISOR_MODELS",
        value_delimiter = ',',
        default_values_t = DEFAULT_ADVISOR_MODELS.map(String::from),
        global = true
    )]
    pub advisor_models: Vec<String>,

    /// SQLite database for transactions, goals and advisor history
    #[arg(long, env = "FIBOT_DB", default_value = "fibot.sqlite", global = true)]
    pub db: PathBuf,

    /// Directory holding the persisted embedding index
    #[arg(long, env = "FIBOT_INDEX_DIR", default_value = "faiss_index", global = true)]
    pub index_dir: PathBuf,

    /// CSV file with corpus Q&A history
    #[arg(long, env = "FIBOT_HISTORY_FILE", default_value = "search_history.csv", global = true)]
    pub history_file: PathBuf,

    /// Read datasets from `<dir>/<owner>__<name>.jsonl` instead of the Hugging Face API
    #[arg(long, env = "FIBOT_CORPUS_DIR", global = true)]
    pub corpus_dir: Option<PathBuf>,

    /// Stop after this many rows per remote dataset
    #[arg(long, env = "FIBOT_MAX_ROWS", global = true)]
    pub max_rows: Option<usize>,

    /// Hugging Face token for gated datasets
    #[arg(long, env = "HF_TOKEN", hide_env_values = true, global = true)]
    pub hf_token: Option<String>,

    /// Local Ollama server (127.0.0.1 only)
    #[arg(long, env = "OLLAMA_URL", default_value = DEFAULT_OLLAMA_URL, global = true)]
    pub ollama_url: String,

    /// Which embedder builds and queries the index
    #[arg(long, env = "FIBOT_EMBEDDER", value_enum, default_value_t = EmbedderKind::Ollama, global = true)]
    pub embedder: EmbedderKind,

    /// Embedding model name passed to the embedder
    #[arg(long, env = "FIBOT_EMBED_MODEL", default_value = "all-minilm", global = true)]
    pub embed_model: String,

    /// Local model that answers corpus questions
    #[arg(long, env = "FIBOT_LOCAL_MODEL", default_value = "granite3.3:2b", global = true)]
    pub local_model: String,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedderKind {
    /// Ollama `/api/embeddings` on 127.0.0.1
    Ollama,
    /// Gemini `embedContent`
    Gemini,
    /// Offline feature hashing
    Hashing,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Log and list transactions
    #[command(subcommand)]
    Txn(TxnCommand),

    /// Spending anomalies and a model-written trend summary
    Insights,

    /// Model budget review against an allocation, with a health score
    Budget(BudgetArgs),

    /// Savings goals and progress
    #[command(subcommand)]
    Goals(GoalsCommand),

    /// Project the future value of a monthly SIP
    Sip(SipArgs),

    /// Structured reading of a finance query
    Nlu {
        #[arg(required = true, trailing_var_arg = true)]
        query: Vec<String>,
    },

    /// Ask the hosted financial advisor
    Ask {
        #[arg(required = true, trailing_var_arg = true)]
        question: Vec<String>,
    },

    /// Corpus question answering
    #[command(subcommand)]
    Rag(RagCommand),

    /// Recent questions, newest first
    History {
        #[arg(long, value_enum, default_value_t = HistorySource::Advisor)]
        source: HistorySource,
        #[arg(long, default_value_t = fibot_ai::finance::HISTORY_PICKER_LIMIT)]
        limit: usize,
    },

    /// Re-display a past advisor answer (1 = newest)
    Select { position: usize },

    /// Interactive session
    Shell,
}

#[derive(Subcommand, Debug, Clone)]
pub enum TxnCommand {
    /// Record a transaction
    Add {
        /// YYYY-MM-DD
        date: String,
        category: String,
        amount: f64,
    },
    /// List transactions, newest date first
    List {
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum GoalsCommand {
    /// Add a goal: `goals add 80000 New bike`
    Add {
        target: f64,
        #[arg(required = true, trailing_var_arg = true)]
        name: Vec<String>,
    },
    /// Goals with progress from savings contributions
    List,
    /// Delete a goal by id
    Remove { id: i64 },
}

#[derive(Args, Debug, Clone)]
pub struct BudgetArgs {
    /// Total monthly budget
    #[arg(long, default_value_t = 50_000.0)]
    pub total: f64,
    #[arg(long, default_value_t = 50)]
    pub needs: u32,
    #[arg(long, default_value_t = 30)]
    pub wants: u32,
    #[arg(long, default_value_t = 10)]
    pub savings: u32,
    #[arg(long, default_value_t = 10)]
    pub investments: u32,
}

#[derive(Args, Debug, Clone)]
pub struct SipArgs {
    /// Monthly contribution
    #[arg(long, default_value_t = 5_000.0)]
    pub monthly: f64,
    /// Expected annual return, in percent
    #[arg(long, default_value_t = 12.0)]
    pub rate: f64,
    #[arg(long, default_value_t = 10)]
    pub years: u32,
}

#[derive(Subcommand, Debug, Clone)]
pub enum RagCommand {
    /// Build the index (or load it if it already exists)
    Build {
        /// Delete any existing index first
        #[arg(long)]
        rebuild: bool,
        #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,
        #[arg(long, default_value_t = DEFAULT_CHUNK_OVERLAP)]
        chunk_overlap: usize,
    },
    /// Answer from the corpus
    Ask {
        #[arg(long, default_value_t = DEFAULT_TOP_K)]
        top_k: usize,
        #[arg(required = true, trailing_var_arg = true)]
        question: Vec<String>,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistorySource {
    /// Advisor answers in the database
    Advisor,
    /// Corpus answers in the CSV file
    Rag,
}

/// One line typed into `fibot shell`.
#[derive(Parser, Debug)]
#[command(no_binary_name = true, disable_version_flag = true)]
pub struct ShellLine {
    #[command(subcommand)]
    pub command: Command,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
        ShellLine::command().debug_assert();
    }

    #[test]
    fn questions_take_the_rest_of_the_line() {
        let line = ShellLine::try_parse_from("ask What is an ETF?".split_whitespace()).unwrap();
        match line.command {
            Command::Ask { question } => assert_eq!(question.join(" "), "What is an ETF?"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn advisor_models_default_and_split() {
        let cli = Cli::try_parse_from(["fibot", "insights"]).unwrap();
        assert_eq!(cli.config.advisor_models.len(), 3);

        let cli = Cli::try_parse_from(["fibot", "--advisor-models", "a,b", "insights"]).unwrap();
        assert_eq!(cli.config.advisor_models, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn sip_defaults_and_flags() {
        let line = ShellLine::try_parse_from(["sip"]).unwrap();
        match line.command {
            Command::Sip(a) => assert_eq!((a.monthly, a.rate, a.years), (5_000.0, 12.0, 10)),
            other => panic!("unexpected {other:?}"),
        }
        let line = ShellLine::try_parse_from("sip --monthly 1000 --rate 0 --years 3".split_whitespace()).unwrap();
        match line.command {
            Command::Sip(a) => assert_eq!((a.monthly, a.rate, a.years), (1_000.0, 0.0, 3)),
            other => panic!("unexpected {other:?}"),
        }
    }
}
