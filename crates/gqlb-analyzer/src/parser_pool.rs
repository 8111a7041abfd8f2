//! Pool of tree-sitter parser threads
//!
//! A `tree_sitter::Parser` cannot be shared, so every worker thread owns one
//! and jobs arrive over a shared channel. The tree goes back to the caller,
//! which lowers it on its own thread.

use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex};
use tree_sitter::{Language, Parser};

/// Grammars the pool can parse with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileType {
    TypeScript,
    Tsx,
    JavaScript,
}

impl FileType {
    /// `None` for anything that is not a script module.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "ts" | "mts" | "cts" => Some(FileType::TypeScript),
            "tsx" => Some(FileType::Tsx),
            "js" | "jsx" | "mjs" | "cjs" => Some(FileType::JavaScript),
            _ => None,
        }
    }

    pub fn language(self) -> Language {
        match self {
            FileType::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            FileType::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
            FileType::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
        }
    }
}

#[derive(Debug)]
pub struct ParseRequest {
    pub file_type: FileType,
    pub content: String,
    pub path: PathBuf,
}

#[derive(Debug)]
pub struct ParseResult {
    pub tree: tree_sitter::Tree,
    pub path: PathBuf,
    pub content: String,
}

type Reply = Sender<Result<ParseResult>>;
type JobQueue = Arc<Mutex<Receiver<(ParseRequest, Reply)>>>;

/// One parser thread. Switches grammar only when the file type changes.
struct Worker {
    id: usize,
    parser: Parser,
    grammar: Option<FileType>,
}

impl Worker {
    fn run(mut self, jobs: JobQueue) {
        tracing::debug!("Parser worker {} started", self.id);
        loop {
            let job = match jobs.lock() {
                Ok(queue) => queue.recv(),
                Err(_) => break,
            };
            let Ok((request, reply)) = job else {
                break;
            };
            if reply.send(self.parse(request)).is_err() {
                tracing::warn!("Parser worker {}: caller went away", self.id);
            }
        }
        tracing::debug!("Parser worker {} stopped", self.id);
    }

    fn parse(&mut self, request: ParseRequest) -> Result<ParseResult> {
        if self.grammar != Some(request.file_type) {
            self.parser
                .set_language(&request.file_type.language())
                .map_err(|e| anyhow!("Cannot load {:?} grammar: {}", request.file_type, e))?;
            self.grammar = Some(request.file_type);
        }
        let tree = self
            .parser
            .parse(&request.content, None)
            .ok_or_else(|| anyhow!("Parser gave up on {}", request.path.display()))?;
        Ok(ParseResult {
            tree,
            path: request.path,
            content: request.content,
        })
    }
}

/// Handle to the worker threads. Clones share the same workers; the threads
/// exit once every handle is dropped.
#[derive(Clone)]
pub struct ParserPool {
    jobs: Sender<(ParseRequest, Reply)>,
}

impl ParserPool {
    pub fn new(workers: usize) -> Self {
        let (jobs, queue) = channel();
        let queue: JobQueue = Arc::new(Mutex::new(queue));
        for id in 0..workers.max(1) {
            let worker = Worker {
                id,
                parser: Parser::new(),
                grammar: None,
            };
            let queue = queue.clone();
            std::thread::spawn(move || worker.run(queue));
        }
        ParserPool { jobs }
    }

    /// Blocks the calling thread until a worker answers.
    pub fn parse_blocking(&self, request: ParseRequest) -> Result<ParseResult> {
        let (reply, answer) = channel();
        self.jobs
            .send((request, reply))
            .map_err(|_| anyhow!("Parser pool is shut down"))?;
        answer.recv().map_err(|_| anyhow!("Parser worker died"))?
    }
}

/// One worker per core, at least two.
pub fn create_parser_pool() -> ParserPool {
    let workers = std::thread::available_parallelism()
        .map(|n| n.get().max(2))
        .unwrap_or(2);
    ParserPool::new(workers)
}
