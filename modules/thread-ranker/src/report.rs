use std::fmt::Write;

use crate::types::Comment;

const INDENT: &str = "    ";

/// Render a comment forest as an indented bullet list, one level per depth.
/// Roots sit at `depth`; replies are only rendered when `include_replies` is set.
pub fn format_comments(comments: &[Comment], depth: usize, include_replies: bool) -> String {
    let mut out = String::new();
    write_comments(&mut out, comments, depth, include_replies);
    out
}

fn write_comments(out: &mut String, comments: &[Comment], depth: usize, include_replies: bool) {
    let indent = INDENT.repeat(depth);
    for comment in comments {
        // Writing into a String cannot fail.
        let _ = writeln!(out, "{indent}- Comment: {}", comment.text);
        let _ = writeln!(out, "{indent}  Score: {}", comment.score);
        if include_replies && !comment.replies.is_empty() {
            let _ = writeln!(out, "{indent}  Replies:");
            write_comments(out, &comment.replies, depth + 1, include_replies);
        }
    }
}

/// Wrap one thread's formatted comments in its report header. `index` is
/// the thread's position in the combined URL list.
pub fn thread_block(index: usize, formatted: &str) -> String {
    format!("\nReddit thread {index}:\n\n{formatted}\n\n")
}

/// Final ranking instructions with the report appended verbatim.
pub fn ranking_prompt(query: Option<&str>, report: &str) -> String {
    let query = query.unwrap_or("");
    format!(
        r#"You will analyze a series of Reddit comments across different threads related to the following query:
QUERY (google search): {query}
Your task is to:
**Rank the query-related elements** mentioned in the comments (e.g., specific items, brands, products) based on the following criteria:
    - **Frequency of mentions**: How often each element is referenced across comments.
    - **Upvotes**: The number of upvotes the comments mentioning each element receive.
    - **Positive replies**: Engagement through supportive replies for each element.
    - **Sentiment**: Whether the overall tone around each element is positive, neutral, or negative, and the degree of each.

### Chain of Thought (CoT) Reasoning Process:
1. **Step 1**: Analyze all query-related elements mentioned and note how frequently they appear.
2. **Step 2**: Consider the number of upvotes and replies supporting each element.
3. **Step 3**: Analyze the sentiment (positive, neutral, negative) for each element based on the language used in the comments.
4. **Step 4**: Based on Steps 1-3, assign a score from 0 to 1, where:
    - **1** indicates that the element is highly regarded and frequently mentioned with positive sentiment and support.
    - **0** indicates that the element is less important or receives little support.

### Output Format:
**Rankings**:
    - Provide a ranked list of the elements along with a score (0-1) for each.
    - The score should reflect the overall user sentiment and support for that element based on the criteria above.
    - Include all elements that are relevant to the query and are mentioned more than 2 times.
    - No explanation is needed for each ranked element in your response.

Here is the set of reddit threads:

{report}
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> Vec<Comment> {
        vec![
            Comment::new("The Name of the Wind", 120).with_replies(vec![
                Comment::new("Still waiting on book 3", 40)
                    .with_replies(vec![Comment::new("Forever", 7)]),
            ]),
            Comment::new("Mistborn", 88),
        ]
    }

    #[test]
    fn single_leaf_has_no_replies_line() {
        let out = format_comments(&[Comment::new("Great pick", 5)], 1, true);

        assert_eq!(out, "    - Comment: Great pick\n      Score: 5\n");
        assert_eq!(out.matches("- Comment:").count(), 1);
        assert!(!out.contains("Replies:"));
    }

    #[test]
    fn each_level_adds_one_indent() {
        let out = format_comments(&tree(), 1, true);
        let expected = concat!(
            "    - Comment: The Name of the Wind\n",
            "      Score: 120\n",
            "      Replies:\n",
            "        - Comment: Still waiting on book 3\n",
            "          Score: 40\n",
            "          Replies:\n",
            "            - Comment: Forever\n",
            "              Score: 7\n",
            "    - Comment: Mistborn\n",
            "      Score: 88\n",
        );
        assert_eq!(out, expected);
    }

    #[test]
    fn indentation_strictly_tracks_depth() {
        let out = format_comments(&tree(), 1, true);
        let depths: Vec<usize> = out
            .lines()
            .filter(|l| l.trim_start().starts_with("- Comment:"))
            .map(|l| (l.len() - l.trim_start().len()) / INDENT.len())
            .collect();
        assert_eq!(depths, vec![1, 2, 3, 1]);
    }

    #[test]
    fn replies_can_be_left_out() {
        let out = format_comments(&tree(), 1, false);
        assert!(!out.contains("Replies:"));
        assert_eq!(out.matches("- Comment:").count(), 2);
    }

    #[test]
    fn empty_forest_renders_nothing() {
        assert_eq!(format_comments(&[], 1, true), "");
    }

    #[test]
    fn thread_block_has_header() {
        let block = thread_block(3, "    - Comment: x\n      Score: 1\n");
        assert!(block.starts_with("\nReddit thread 3:\n\n"));
        assert!(block.contains("- Comment: x"));
    }

    #[test]
    fn ranking_prompt_embeds_query_and_report() {
        let prompt = ranking_prompt(Some("best fantasy novel books"), "REPORT-BODY");
        assert!(prompt.contains("QUERY (google search): best fantasy novel books"));
        assert!(prompt.contains("mentioned more than 2 times"));
        assert!(prompt.trim_end().ends_with("REPORT-BODY"));
    }
}
