//! Static configuration surface: the model and personality registries, the
//! default generation parameters, and the environment-supplied credential.
//!
//! Registry entries are data, not behavior. Personality system prompts may
//! be overridden per key by a stored `personality_<key>` template.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelSize {
    Small,
    Medium,
    Large,
    XLarge,
}

#[derive(Debug, Clone, Copy)]
pub struct ModelSpec {
    /// Registry key shown to the user.
    pub key: &'static str,
    /// Identifier sent on the wire (or a local checkpoint path).
    pub name: &'static str,
    pub description: &'static str,
    pub context_length: u32,
    pub size: ModelSize,
    /// Whether this model is served by the hosted completion API.
    pub api: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct PersonalitySpec {
    pub key: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub prompt: &'static str,
}

pub const DEFAULT_MODEL: &str = "Groq-LLaMA3-8B";
pub const DEFAULT_PERSONALITY: &str = "friendly";

const MODELS: &[ModelSpec] = &[
    ModelSpec {
        key: "TinyLlama-Chat",
        name: "PY007/TinyLlama-1.1B-Chat-v0.3",
        description: "Fast and efficient chat model",
        context_length: 512,
        size: ModelSize::Small,
        api: false,
    },
    ModelSpec {
        key: "Phi-2",
        name: "susnato/phi-2",
        description: "Good performance and speed",
        context_length: 512,
        size: ModelSize::Small,
        api: false,
    },
    ModelSpec {
        key: "Groq-LLaMA3-8B",
        name: "llama3-8b-8192",
        description: "Fast LLaMA3 8B model",
        context_length: 8192,
        size: ModelSize::Medium,
        api: true,
    },
    ModelSpec {
        key: "Groq-Mixtral-8x7B",
        name: "mixtral-8x7b-32768",
        description: "Powerful Mixtral 8x7B model",
        context_length: 32768,
        size: ModelSize::Large,
        api: true,
    },
    ModelSpec {
        key: "Groq-Claude-3-Opus",
        name: "claude-3-opus-20240229",
        description: "High-quality Claude 3 Opus model",
        context_length: 8192,
        size: ModelSize::XLarge,
        api: true,
    },
    ModelSpec {
        key: "Groq-Gemma-7B",
        name: "gemma-7b-it",
        description: "Google's Gemma 7B model",
        context_length: 8192,
        size: ModelSize::Medium,
        api: true,
    },
];

const PERSONALITIES: &[PersonalitySpec] = &[
    PersonalitySpec {
        key: "friendly",
        name: "Friendly",
        description: "Warm and conversational",
        prompt: "You are a friendly and helpful mental health AI assistant. Express yourself in a warm and approachable way while maintaining accuracy. IMPORTANT: You have memory of the entire conversation history provided to you. You should acknowledge and remember details shared by the user throughout the conversation. Never claim that you don't remember previous parts of the conversation or that each interaction is new. Maintain context and continuity throughout the conversation.",
    },
    PersonalitySpec {
        key: "professional",
        name: "Professional",
        description: "Direct and clear",
        prompt: "You are a professional mental health AI assistant. Be direct and clear in your responses. IMPORTANT: You have memory of the entire conversation history provided to you. You should acknowledge and remember details shared by the user throughout the conversation. Never claim that you don't remember previous parts of the conversation or that each interaction is new. Maintain context and continuity throughout the conversation.",
    },
    PersonalitySpec {
        key: "therapeutic",
        name: "Therapeutic",
        description: "Supportive and empathetic",
        prompt: "You are a therapeutic mental health AI assistant focused on providing emotional support. Respond with empathy and understanding while offering constructive guidance. IMPORTANT: You have memory of the entire conversation history provided to you. You should acknowledge and remember details shared by the user throughout the conversation. Never claim that you don't remember previous parts of the conversation or that each interaction is new. Maintain context and continuity throughout the conversation.",
    },
];

pub fn models() -> &'static [ModelSpec] {
    MODELS
}

pub fn personalities() -> &'static [PersonalitySpec] {
    PERSONALITIES
}

/// Look up a model by registry key, falling back to the default entry when
/// the key is unknown.
pub fn current_model(key: &str) -> &'static ModelSpec {
    MODELS
        .iter()
        .find(|m| m.key == key)
        .unwrap_or_else(|| &MODELS[0])
}

pub fn current_personality(key: &str) -> &'static PersonalitySpec {
    PERSONALITIES
        .iter()
        .find(|p| p.key == key)
        .unwrap_or_else(|| &PERSONALITIES[0])
}

/// Sampling parameters forwarded to the completion service. Fields the wire
/// format does not support (`repetition_penalty`) are carried here but never
/// serialized into a request.
#[derive(Debug, Clone)]
pub struct GenerationParams {
    pub temperature: f32,
    pub top_p: Option<f32>,
    pub max_tokens: u32,
    pub repetition_penalty: Option<f32>,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_p: Some(0.9),
            max_tokens: 256,
            repetition_penalty: Some(1.2),
        }
    }
}

/// The completion-service credential. Environment-supplied only; there is no
/// built-in fallback value.
pub fn api_key() -> Option<String> {
    std::env::var("GROQ_API_KEY").ok().filter(|k| !k.is_empty())
}

/// Optional endpoint override for self-hosted gateways.
pub fn base_url() -> Option<String> {
    std::env::var("GROQ_BASE_URL").ok().filter(|u| !u.is_empty())
}
