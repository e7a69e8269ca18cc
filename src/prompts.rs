//! System instructions for each content kind.
//!
//! Each prompt names the task and the exact JSON shape to answer with, which
//! is what [`crate::content::parse_response`] checks.

use crate::content::ContentKind;

const CATEGORIES: &str = "You are an expert in BISAC book categorization. \
Read the text and suggest the three BISAC categories that best fit it. \
Answer ONLY with a JSON object of this shape:\n\
{\"mainCategory\": \"MAIN_CATEGORY\", \"secondaryCategories\": [\"SECONDARY_1\", \"SECONDARY_2\"]}";

const KEYWORDS: &str = "You are an SEO expert. Read the text and suggest seven \
keywords relevant to the book. The keywords must all be DIFFERENT from each other. \
Answer ONLY with a JSON object of this shape:\n\
{\"keywords\": [\"K1\", \"K2\", \"K3\", \"K4\", \"K5\", \"K6\", \"K7\"]}";

const SCENES: &str = "You are a book cover designer. Read the text and pick three \
distinct, visually striking scenes that would work as a cover. \
Answer ONLY with a JSON object of this shape:\n\
{\"scenes\": [{\"title\": \"SHORT_TITLE\", \"description\": \"DETAILED_IMAGE_DESCRIPTION\"}, \
{\"title\": \"...\", \"description\": \"...\"}, {\"title\": \"...\", \"description\": \"...\"}]}";

const BACK_COVER: &str = "You are a publishing copywriter. Write engaging back-cover \
copy for the book without revealing the ending. \
Answer ONLY with a JSON object of this shape:\n\
{\"backCover\": \"BACK_COVER_TEXT\"}";

const PREFACE: &str = "You are an editor. Write a preface that introduces the book, \
its themes, and why it is worth reading. \
Answer ONLY with a JSON object of this shape:\n\
{\"preface\": \"PREFACE_TEXT\"}";

const STORE_DESCRIPTION: &str = "You are an e-commerce copywriter. Write a persuasive \
online store description for the book. \
Answer ONLY with a JSON object of this shape:\n\
{\"storeDescription\": \"STORE_DESCRIPTION_TEXT\"}";

const SYNOPSIS: &str = "You are a literary agent. Write a complete synopsis of the book \
covering its premise, main characters, and arc. \
Answer ONLY with a JSON object of this shape:\n\
{\"synopsis\": \"SYNOPSIS_TEXT\"}";

/// System instructions for `kind`.
#[must_use]
pub fn system_instructions(kind: ContentKind) -> &'static str {
    match kind {
        ContentKind::Categories => CATEGORIES,
        ContentKind::Keywords => KEYWORDS,
        ContentKind::Scenes => SCENES,
        ContentKind::BackCover => BACK_COVER,
        ContentKind::Preface => PREFACE,
        ContentKind::StoreDescription => STORE_DESCRIPTION,
        ContentKind::Synopsis => SYNOPSIS,
    }
}
