//! System prompt describing the portfolio owner.

use std::path::Path;

use anyhow::Context;

const PORTFOLIO_PROMPT: &str = "\
You are the assistant embedded in Jake's personal portfolio website.
Visitors use you to learn about Jake: his background, skills, projects and how to get in touch.

Guidelines:
- Answer only questions about Jake, his work and this site. Politely decline anything else.
- Keep answers short and friendly. Use markdown lists or tables when they help.
- Never invent employers, dates, credentials or project details. If you do not know, say so \
and point the visitor to the Projects or Contact sections of the site.
- For collaboration or hiring enquiries, suggest the contact form on the site.
";

/// Supplies the fixed system prompt sent with every upstream request.
pub trait KnowledgeSource: Send + Sync {
    fn system_prompt(&self) -> String;
}

/// Built-in prompt compiled into the binary.
#[derive(Debug, Default, Clone, Copy)]
pub struct PortfolioKnowledge;

impl KnowledgeSource for PortfolioKnowledge {
    fn system_prompt(&self) -> String {
        PORTFOLIO_PROMPT.to_string()
    }
}

/// Prompt loaded once from a text file at startup.
#[derive(Debug, Clone)]
pub struct FileKnowledge {
    prompt: String,
}

impl FileKnowledge {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let prompt = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read knowledge file {}", path.display()))?;
        if prompt.trim().is_empty() {
            anyhow::bail!("Knowledge file {} is empty", path.display());
        }
        Ok(Self { prompt })
    }
}

impl KnowledgeSource for FileKnowledge {
    fn system_prompt(&self) -> String {
        self.prompt.clone()
    }
}
