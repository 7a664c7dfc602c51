//! Shared UI icons and emojis.

use console::Emoji;

// Status indicators
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "[OK]");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "[ERR]");
pub static SPARKLE: Emoji<'_, '_> = Emoji("✨ ", "*");
pub static SKIP: Emoji<'_, '_> = Emoji("⏭️  ", "[SKIP]");

// Run control
pub static PAUSE: Emoji<'_, '_> = Emoji("⏸️  ", "[PAUSE]");
pub static RESUME: Emoji<'_, '_> = Emoji("▶️  ", "[>]");
pub static STOP: Emoji<'_, '_> = Emoji("⏹️  ", "[STOP]");
pub static SAVE: Emoji<'_, '_> = Emoji("💾 ", "[SAVE]");

// Workflow
pub static BOOK: Emoji<'_, '_> = Emoji("📖 ", "");
pub static PEN: Emoji<'_, '_> = Emoji("✍️  ", "");
pub static CRYSTAL: Emoji<'_, '_> = Emoji("🔮 ", "[PLAN]");
pub static REVIEW: Emoji<'_, '_> = Emoji("🔍 ", "[R]");
