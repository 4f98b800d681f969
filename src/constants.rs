// Fixed strings for the assistant persona and the chat page. Everything
// tunable at runtime lives in `config::Config` instead.

/// Name under which the remote persona record is created.
pub const ASSISTANT_NAME: &str = "Healthcare Assistant";

/// Instructions attached to the persona when it is created.
pub const ASSISTANT_INSTRUCTIONS: &str = "You are a healthcare professional assisting patients \
with their health-related queries. Offer guidance on nutrition, exercise, medication, and \
lifestyle changes to promote optimal health and well-being, tailored to the user's needs. Be \
empathetic and supportive in your responses, and ensure that all information provided is \
evidence-based and reliable. Always give a plan of action for the user.";

/// Model backing the persona unless overridden via `SALUS_MODEL`.
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// Default base URL of the hosted assistants API.
pub const DEFAULT_API_BASE_URL: &str = "https://api.openai.com/v1";

// Chat page copy.
pub const PAGE_TITLE: &str = "Healthcare Assistant";
pub const PAGE_SUBHEADER: &str = "Ask me anything about health!";
pub const INPUT_PLACEHOLDER: &str = "Type your health-related questions here:";
