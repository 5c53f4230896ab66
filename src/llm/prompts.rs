//! Default instruction prompts, one per provider.
//!
//! The Qwen prompt carries an extra rule against HTML / code-fence
//! wrapping; the normalizer still cleans up when the model ignores it.

pub const GEMINI_DEFAULT_PROMPT: &str = "Recognize all text in the image. Requirements:
1. Extract every piece of visible text
2. Keep the original paragraph structure and line breaks
3. Output any tables as Markdown tables
4. Output any code as fenced code blocks
5. Output only the recognized content, without explanations or descriptions";

pub const QWEN_DEFAULT_PROMPT: &str = "Recognize all text in the image and output it as plain text. Requirements:
1. Extract every piece of visible text
2. Keep the original paragraph structure and line breaks
3. Output any tables as Markdown tables
4. Output any code as fenced code blocks
5. Output only the recognized content, without explanations or descriptions
6. Do not wrap the output in HTML tags or a code block";
