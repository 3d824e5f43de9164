// Prompt templates and a tiny `{{placeholder}}` renderer.

pub struct AiPrompt {
    pub vibe: &'static str,
    pub captions: &'static str,
    pub rerank: &'static str,
    pub refine: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub enum Prompt {
    Vibe,
    Captions,
    Rerank,
    Refine,
}

impl AiPrompt {
    pub const fn new() -> AiPrompt {
        AiPrompt {
            vibe: include_str!("./templates/vibe.md"),
            captions: include_str!("./templates/captions.md"),
            rerank: include_str!("./templates/rerank.md"),
            refine: include_str!("./templates/refine.md"),
        }
    }

    pub fn get(&self, prompt: Prompt) -> &'static str {
        match prompt {
            Prompt::Vibe => self.vibe,
            Prompt::Captions => self.captions,
            Prompt::Rerank => self.rerank,
            Prompt::Refine => self.refine,
        }
    }

    // Fill `{{key}}` placeholders. Unknown placeholders are left as-is.
    pub fn render(&self, prompt: Prompt, vars: &[(&str, &str)]) -> String {
        let mut out = self.get(prompt).to_string();
        for (key, value) in vars {
            out = out.replace(&format!("{{{{{key}}}}}"), value);
        }
        out
    }
}

impl Default for AiPrompt {
    fn default() -> Self {
        Self::new()
    }
}

pub static PROMPTS: AiPrompt = AiPrompt::new();
