use std::fs;

use fibot_ai::chunking::ChunkConfig;
use fibot_ai::embeddings::Embedder;
use fibot_ai::finance::{analyze_budget, analyze_query, spending_insights, Advisor, BudgetRequest, HISTORY_PICKER_LIMIT, TREND_WINDOW};
use fibot_ai::index::{build_or_load, EmbeddingIndex, IndexBuildInput};
use fibot_ai::output::ModelOutput;
use fibot_ai::rag::RagAssistant;
use fibot_ai::retrieve::Retriever;
use fibot_ai::synth::AnswerSynthesizer;
use fibot_core::analytics::{sip_future_value, BudgetAllocation};
use fibot_core::db::open_and_migrate;
use fibot_core::domain::NewTransaction;
use fibot_core::error::AppError;
use fibot_core::goals::{add_goal, delete_goal, goal_progress};
use fibot_core::history::{history_label, CsvHistoryFile, SqliteHistoryStore};
use fibot_core::ledger::{count_transactions, insert_transaction, recent_transactions};
use fibot_core::reads::CachedReads;
use fibot_core::session::SessionContext;
use rusqlite::Connection;

use crate::cli::{BudgetArgs, Command, EmbedderKind, GoalsCommand, HistorySource, RagCommand, SipArgs, TxnCommand};
use crate::config::AppConfig;

/// Everything one session needs. Lives for a single command, or for the whole
/// `fibot shell` session.
pub struct App {
    cfg: AppConfig,
    conn: Connection,
    reads: CachedReads,
    session: SessionContext,
    index: Option<EmbeddingIndex>,
}

fn snippet(text: &str, max_chars: usize) -> String {
    let t = text.trim();
    if t.chars().count() <= max_chars {
        return t.to_string();
    }
    let mut s: String = t.chars().take(max_chars).collect();
    s.push_str("...");
    s
}

fn joined(words: &[String]) -> String {
    words.join(" ")
}

fn sip(args: &SipArgs) -> Result<(), AppError> {
    let p = sip_future_value(args.monthly, args.rate, args.years)?;
    println!("Invested:         ₹{:.2}", p.invested);
    println!("Estimated Wealth: ₹{:.2}", p.future_value);
    println!("Gains:            ₹{:.2}", p.gains);
    Ok(())
}

impl App {
    pub fn open(cfg: AppConfig) -> Result<Self, AppError> {
        let conn = open_and_migrate(&cfg.db_path)?;
        tracing::debug!(db = %cfg.db_path.display(), "database ready");
        Ok(Self {
            cfg,
            conn,
            reads: CachedReads::new(),
            session: SessionContext::new(),
            index: None,
        })
    }

    pub fn execute(&mut self, command: Command) -> Result<(), AppError> {
        match command {
            Command::Txn(TxnCommand::Add { date, category, amount }) => self.txn_add(date, category, amount),
            Command::Txn(TxnCommand::List { limit }) => self.txn_list(limit),
            Command::Insights => self.insights(),
            Command::Budget(args) => self.budget(&args),
            Command::Goals(GoalsCommand::Add { target, name }) => self.goal_add(&joined(&name), target),
            Command::Goals(GoalsCommand::List) => self.goal_list(),
            Command::Goals(GoalsCommand::Remove { id }) => self.goal_remove(id),
            Command::Sip(args) => sip(&args),
            Command::Nlu { query } => self.nlu(&joined(&query)),
            Command::Ask { question } => self.ask(&joined(&question)),
            Command::Rag(RagCommand::Build {
                rebuild,
                chunk_size,
                chunk_overlap,
            }) => self.rag_build(rebuild, ChunkConfig::new(chunk_size, chunk_overlap)?),
            Command::Rag(RagCommand::Ask { top_k, question }) => self.rag_ask(top_k, &joined(&question)),
            Command::History { source, limit } => self.history(source, limit),
            Command::Select { position } => self.select(position),
            Command::Shell => crate::shell::run(self),
        }
    }

    fn txn_add(&mut self, date: String, category: String, amount: f64) -> Result<(), AppError> {
        let t = insert_transaction(&self.conn, &NewTransaction { date, category, amount })?;
        self.reads.invalidate_all();
        println!("✅ Saved #{}: {} {} ₹{:.2}", t.id, t.date, t.category, t.amount);
        Ok(())
    }

    fn txn_list(&self, limit: Option<usize>) -> Result<(), AppError> {
        let txns = self.reads.transactions(&self.conn)?;
        if txns.is_empty() {
            println!("No transactions yet.");
            return Ok(());
        }
        let shown = limit.unwrap_or(usize::MAX).min(txns.len());
        for t in &txns[..shown] {
            println!("{:>5}  {}  {:<14} ₹{:>12.2}", t.id, t.date, t.category, t.amount);
        }
        if shown < txns.len() {
            println!("({shown} of {} transactions)", count_transactions(&self.conn)?);
        }
        Ok(())
    }

    fn insights(&self) -> Result<(), AppError> {
        let all = self.reads.transactions(&self.conn)?;
        if all.is_empty() {
            println!("No transactions yet. Add some with `fibot txn add`.");
            return Ok(());
        }
        let llm = self.cfg.gemini_llm()?;
        let recent = recent_transactions(&self.conn, TREND_WINDOW)?;
        let Some(out) = spending_insights(&llm, &self.cfg.gemini_model, &all, &recent)? else {
            return Ok(());
        };
        if out.anomalies.is_empty() {
            println!("No unusual spikes.");
        }
        for a in &out.anomalies {
            println!("🚩 {}", a.message());
        }
        println!("\n{}", out.trends);
        Ok(())
    }

    fn budget(&self, args: &BudgetArgs) -> Result<(), AppError> {
        let req = BudgetRequest {
            total_budget: args.total,
            allocation: BudgetAllocation {
                needs: args.needs,
                wants: args.wants,
                savings: args.savings,
                investments: args.investments,
            },
        };
        req.validate()?;
        let txns = self.reads.transactions(&self.conn)?;
        if txns.is_empty() {
            println!("No transactions found. Add entries with `fibot txn add` first.");
            return Ok(());
        }
        let llm = self.cfg.gemini_llm()?;
        let Some(analysis) = analyze_budget(&llm, &self.cfg.gemini_model, &txns, &req)? else {
            return Ok(());
        };
        match &analysis.report {
            ModelOutput::Parsed(report) => {
                if let Some((score, band)) = analysis.health {
                    println!("❤️ Health Score: {score}/100 ({})", band.label());
                }
                for (bucket, b) in &report.summary {
                    println!("  {bucket:<12} spent ₹{:.2} of ₹{:.2} [{:?}]", b.spent, b.limit, b.status);
                }
                for alert in &report.anomalies {
                    println!("🚩 {alert}");
                }
                if !report.advice.is_empty() {
                    println!("\n💡 {}", report.advice);
                }
            }
            ModelOutput::Malformed { raw, reason } => {
                eprintln!("⚠️ The model did not return a usable report ({reason}). Raw output:");
                println!("{raw}");
            }
        }
        Ok(())
    }

    fn goal_add(&mut self, name: &str, target: f64) -> Result<(), AppError> {
        let g = add_goal(&self.conn, name, target)?;
        self.reads.invalidate_all();
        println!("🎯 Added goal #{}: {} (₹{:.2})", g.id, g.name, g.target);
        Ok(())
    }

    fn goal_list(&self) -> Result<(), AppError> {
        let goals = self.reads.goals(&self.conn)?;
        if goals.is_empty() {
            println!("No goals yet.");
            return Ok(());
        }
        let saved = self.reads.savings_total(&self.conn)?;
        println!("Total saved: ₹{saved:.2}");
        for p in goal_progress(&goals, saved) {
            let mark = if p.achieved { " ✅" } else { "" };
            println!(
                "{:>5}  {:<24} ₹{:.2} / ₹{:.2} ({:.0}%){mark}",
                p.goal.id,
                p.goal.name,
                p.saved.min(p.goal.target),
                p.goal.target,
                p.fraction * 100.0
            );
        }
        Ok(())
    }

    fn goal_remove(&mut self, id: i64) -> Result<(), AppError> {
        delete_goal(&self.conn, id)?;
        self.reads.invalidate_all();
        println!("Removed goal #{id}");
        Ok(())
    }

    fn nlu(&mut self, query: &str) -> Result<(), AppError> {
        let llm = self.cfg.gemini_llm()?;
        let out = analyze_query(&llm, &self.cfg.gemini_model, &mut self.session, query)?;
        match out.analysis {
            ModelOutput::Parsed(a) => {
                let pretty = serde_json::to_string_pretty(&a).map_err(|e| {
                    AppError::new("OUTPUT_ENCODE_FAILED", "Failed to print analysis").with_details(e.to_string())
                })?;
                println!("{pretty}");
            }
            ModelOutput::Malformed { raw, .. } => {
                eprintln!("⚠️ AI did not return valid JSON. Raw output:");
                println!("{raw}");
            }
        }
        Ok(())
    }

    fn ask(&mut self, question: &str) -> Result<(), AppError> {
        let llm = self.cfg.gemini_llm()?;
        let advisor = Advisor::new(&llm, self.cfg.advisor_fallback()?);
        let store = SqliteHistoryStore::new(&self.conn);
        let reply = advisor.ask(&mut self.session, &store, &self.reads, question)?;
        println!("🔍 {}\n\n{}", reply.question, reply.answer);
        if let Some(e) = &reply.error {
            tracing::warn!(code = %e.code, details = ?e.details, "advisor returned no model answer");
        }
        Ok(())
    }

    fn ensure_index(&mut self, embedder: &dyn Embedder, chunking: ChunkConfig) -> Result<(), AppError> {
        if self.index.is_some() {
            return Ok(());
        }
        let source = self.cfg.dataset_source();
        let index = build_or_load(
            &self.cfg.index_dir,
            IndexBuildInput {
                source: source.as_ref(),
                datasets: &self.cfg.datasets,
                chunking,
                embedder,
                model: &self.cfg.embed_model,
            },
        )?;
        if index.model() != self.cfg.embed_model {
            tracing::warn!(
                index_model = index.model(),
                configured = %self.cfg.embed_model,
                "index was built with a different embedding model"
            );
        }
        self.index = Some(index);
        Ok(())
    }

    fn rag_build(&mut self, rebuild: bool, chunking: ChunkConfig) -> Result<(), AppError> {
        if rebuild && self.cfg.index_dir.exists() {
            fs::remove_dir_all(&self.cfg.index_dir).map_err(|e| {
                AppError::new("AI_INDEX_BUILD_FAILED", "Failed to remove existing index")
                    .with_details(format!("path={}; err={}", self.cfg.index_dir.display(), e))
            })?;
            self.index = None;
        }
        if self.cfg.embedder == EmbedderKind::Ollama && !self.cfg.index_dir.exists() {
            self.cfg.ollama_client()?.health_check()?;
        }
        let embedder = self.cfg.embedder()?;
        self.ensure_index(embedder.as_ref(), chunking)?;
        if let Some(index) = &self.index {
            println!(
                "Index ready at {}: {} chunks, {} dims, model {}",
                self.cfg.index_dir.display(),
                index.len(),
                index.dims(),
                index.model()
            );
        }
        Ok(())
    }

    fn rag_ask(&mut self, top_k: usize, question: &str) -> Result<(), AppError> {
        self.cfg.ollama_client()?.health_check()?;
        let embedder = self.cfg.embedder()?;
        let llm = self.cfg.local_llm()?;
        self.ensure_index(embedder.as_ref(), ChunkConfig::default())?;
        let index = self
            .index
            .as_ref()
            .ok_or_else(|| AppError::new("AI_INDEX_NOT_READY", "Index not loaded"))?;

        let assistant = RagAssistant::new(
            Retriever::new(index, embedder.as_ref()).with_top_k(top_k),
            AnswerSynthesizer::new(&llm, self.cfg.local_model.clone()),
        );
        let store = CsvHistoryFile::new(&self.cfg.history_file);
        let out = assistant.ask(&mut self.session, &store, &self.reads, question)?;

        println!("🔍 {}\n\n{}", out.question, out.answer);
        if !out.sources.is_empty() {
            println!("\nSources:");
            for (i, s) in out.sources.iter().enumerate() {
                println!("{}. {}", i + 1, snippet(s, 300));
            }
        }
        Ok(())
    }

    fn history(&self, source: HistorySource, limit: usize) -> Result<(), AppError> {
        let records = match source {
            HistorySource::Advisor => self.reads.recent_history(&SqliteHistoryStore::new(&self.conn), limit),
            HistorySource::Rag => self.reads.recent_history(&CsvHistoryFile::new(&self.cfg.history_file), limit),
        };
        if records.is_empty() {
            println!("No searches yet.");
        }
        for (i, r) in records.iter().enumerate() {
            println!("{:>3}. {}", i + 1, history_label(&r.question));
        }
        Ok(())
    }

    fn select(&mut self, position: usize) -> Result<(), AppError> {
        let store = SqliteHistoryStore::new(&self.conn);
        let records = self.reads.recent_history(&store, HISTORY_PICKER_LIMIT);
        let record = position
            .checked_sub(1)
            .and_then(|i| records.get(i))
            .ok_or_else(|| {
                AppError::new("VALIDATION_SELECTION", "No history entry at that position")
                    .with_details(format!("position={position}; available={}", records.len()))
            })?;
        self.session.select_history(record);
        if let Some(sel) = self.session.selected() {
            println!("🔍 {}\n\n{}", sel.question, sel.answer);
        }
        Ok(())
    }
}
