//! # Help Text
//!
//! Help and welcome messages for bot commands.
//! Displayed to the user via `/start` and `/help`.

pub const WELCOME: &str = concat!(
    "👋 Welcome to the Quiz Extractor bot!\n",
    "\n",
    "Send me a QuizBot link like https://t.me/QuizBot?start=... ",
    "and I will reply with every question and its correct answer.\n",
    "\n",
    "Type /help for more."
);

pub const MAIN: &str = concat!(
    "🤖 Quiz Extractor Help\n",
    "\n",
    "• Paste any QuizBot link into the chat\n",
    "• /quiz <link or start parameter>: extract a quiz\n",
    "• /start <start parameter>: same as /quiz\n",
    "• /help: this message\n",
    "\n",
    "Correct answers are marked with ✅. Results arrive as a .txt file."
);
