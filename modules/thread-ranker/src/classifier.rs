use std::time::Duration;

use ai_client::truncate_to_char_boundary;
use tracing::{debug, warn};

use crate::error::{RankerError, Result};
use crate::traits::LanguageModel;
use crate::types::{RelevanceVerdict, ThreadDocument};

/// Enough room for a one-word answer plus any preamble the model insists on.
pub const CLASSIFIER_MAX_TOKENS: u32 = 1000;

const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(2);
/// Ceiling for a single backoff sleep.
pub const MAX_RETRY_BACKOFF: Duration = Duration::from_secs(60);

/// Asks the model whether a thread answers the query.
pub struct RelevanceClassifier<'a> {
    model: &'a dyn LanguageModel,
    retries: u32,
    retry_backoff: Duration,
}

impl<'a> RelevanceClassifier<'a> {
    pub fn new(model: &'a dyn LanguageModel) -> Self {
        Self {
            model,
            retries: 0,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
        }
    }

    /// Retry rate-limited or transient failures up to `retries` extra times.
    /// Backoff doubles after each attempt.
    pub fn with_retries(mut self, retries: u32, backoff: Duration) -> Self {
        self.retries = retries;
        self.retry_backoff = backoff;
        self
    }

    pub async fn classify(
        &self,
        query: Option<&str>,
        document: &ThreadDocument,
    ) -> Result<RelevanceVerdict> {
        let prompt = relevance_prompt(
            query.unwrap_or(""),
            document.title_or_placeholder(),
            document.body_or_placeholder(),
        );

        let mut attempt = 0;
        let raw = loop {
            match self.model.complete(&prompt, CLASSIFIER_MAX_TOKENS, 0.0).await {
                Ok(raw) => break raw,
                Err(e) if e.is_retryable() && attempt < self.retries => {
                    let backoff = backoff_for(self.retry_backoff, attempt);
                    attempt += 1;
                    warn!(
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "Relevance check failed, retrying after backoff"
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => return Err(RankerError::ClassifierFailure(e.to_string())),
            }
        };

        debug!(
            response = truncate_to_char_boundary(raw.trim(), 80),
            "Relevance model response"
        );

        Ok(RelevanceVerdict::from_response(&raw))
    }
}

/// `base * 2^attempt`, capped at [`MAX_RETRY_BACKOFF`].
fn backoff_for(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt))
        .min(MAX_RETRY_BACKOFF)
}

/// Few-shot relevance prompt: four worked examples, then the live thread.
pub fn relevance_prompt(query: &str, title: &str, body: &str) -> String {
    format!(
        r#""Given the following query (e.g. google search) assess the following title and body of a reddit thread.
Respond with YES if the thread seems directly pertinent to the question and NO otherwise. Below are some examples.  The value in the RESPONSE field is your expected response in these cases.
EXAMPLE 1:
    QUERY: "best fantasy novel books",
    TITLE: "Good fantasy books for aphants? : r/Aphantasia"
    BODY: {EXAMPLE_BODY_APHANTASIA}

RESPONSE: NO

this is because although it discusses good fantasy books, it is limited to only those people with aphantasia, which is unlikely to be what the query wants information about specifically.

EXAMPLE 2:
    QUERY: "best fantasy novel books",
    TITLE: "What in your opinion, is the BEST fantasy novel or series that You've read? : r/Fantasy"
    BODY: {EXAMPLE_BODY_BEST_FANTASY}

RESPONSE: YES

This is a perfect example of a YES since it aims to address what is the overall best fantasy novel, which seems to be what the user is asking for.

EXAMPLE 3:
    QUERY: "best tv shows of all time"
    TITLE: "Let’s stop pretending that Daredevil is one of the best TV shows of all time. : r/Daredevil"
    BODY: {EXAMPLE_BODY_DAREDEVIL}

RESPONSE: NO

This is too specific to daredevil. The user asked about best tv shows of all time, this question seems to just dive into one tv show and discuss why it is not as good as others think it is.
This could be on the fence, if this were a slightly more broad discussion this might become a yes but as it is it is too narrow.
Reading it wouldn't be very helpful to a user trying to find the "best tv shows of all time".

EXAMPLE 4:
    QUERY: "best tv shows of all time"
    TITLE: "Anyone else think Lost is still the best tv show of all time? : r/lost"
    BODY: {EXAMPLE_BODY_LOST}

RESPONSE: NO

This is too specific to just talking about Lost.  The user seems to be looking for a thread that gets opinions from everyone on their favorite tv show of all time, not just if Lost is their favorite.


Carefully review these examples and their learnings, then carefully read the following information for a new reddit thread and query and respond either YES or NO.
It is absolutely critical that you include no other words in your response other than either "YES" or "NO".

QUERY: {query}
TITLE: {title}
BODY: {body}
"#
    )
}

const EXAMPLE_BODY_APHANTASIA: &str = r#"
In Short: Does anyone have good recommendation for fantasy series books?

Background:

When I read books, I don't care one bit about character or room descriptions. I just read them vertically. Surely, this must be something a lot of you can relate to. The most important aspect for me is a good plot line.

Also, I'm not sure that this is related to aphantasia, but I have difficulty when there is a lot of multiple names in books. I often have to backtrack or google who a character is when reading.

I really like the "Magician" series from Raymond E. Feist. I never had an issue here with keeping track of names because when a character returns after some time, there is always a little reminder. E.g. "Nakur, the little magician". This triggers the linking in my mind and I know immediately who is meant. There is quite a lot of different names in the books, but it never bothered me because of the way it was handled. I always had troubles with names in books before, but this was the first book I read where this wasn't an issue.

After completing this series, I tried the "Wheel of Time" series from Robert Jordan. I struggled myself through 5 books, but then I let it hang for a while. Picking it up again now would require so much work to know who everyone is again. I always had to google a lot while reading this series, which often spoils some aspects as well.

I didn't know about aphantasia yet while I was reading these books. I've known about it for 2 years now but haven't read since. It all makes a lot more sense now why I struggled so much with the wheel of time. And knowing what I know now, I don't want to pick it up again.

So, do any of you fellow aphants have a good recommendation?
"#;

const EXAMPLE_BODY_BEST_FANTASY: &str = r#"
Sometime last night I asked about the worst and I'm getting some frankly amazing responses.

But now for my shameless reading list I want to know what you all think is the best.

One of my favorites is Elantris, that book is beautifully written to me and Ive reread it more times than I can count.
"#;

const EXAMPLE_BODY_DAREDEVIL: &str = r#"
People CLEARLY need to expand their palette to shows like Breaking Bad or The Sopranos. I want to make it clear that Daredevil can be your favorite show; that’s okay!

Daredevil is a show that had great talent out their hearts into what they had: which wasn’t much. One look at some of the CGI and you know what I mean… it’s good they avoided having to resort to it for most of it.

Daredevil is great in some areas: fight scenes and acting. Cinematography too even if the gear they had wasn’t as quality compared to the standard that recent super hero shows are using.

While the writing was inoffensive, good, and sometimes great, the story still wasn’t anything to applaud whatsoever. It was above average I’d say.

To pretend that the show is in the top 50 TV shows of all time is hilarious to me. And if we’re including movies too… well you seriously need to watch some more stuff besides the action genre.

We need to stop saying that it’s the best superhero live action media to exist. It adapted the source material much better than most of its competitors, but that doesn’t make it better or worse for being comic accurate. The 2017 film “Logan”, was much better than Daredevil, which isn’t anything to scoff at!

While I’m not a big fan of super hero movies or shows to begin with, I have seen the Avengers films (the first two are just okay, the third the best), The Batman, Joker, The Batman, Into The Spider Verse, and TDK trilogy. All of these are better than Daredevil from the standpoint of people who have worked in the film and television industry. A fans perspective while be different from the perspective of an executive producer or editor.

It is a good show, can be great in certain scenes. The season was a solid 8, the second I would give a 6.5, and the third I’d give an 8.5. Nothing more, nothing less. Its good.
"#;

const EXAMPLE_BODY_LOST: &str = r#"
There have been plenty of great shows since Lost ended 10+ years ago but nothing has come close to it for me.

Lost offered an experience like no other series. All the mysteries and theories (I was satisfied with most of the answers btw), all the crazy twists (like "We have to go back", time travel etc.) and hype..not to mention the best part, the amazing characters who were all so well developed (some of my favourites: Jack, Locke, Sawyer, Juliet).

It wasn't perfect, its clear the writers didn't plan out everything and there is some padding in the earlier seasons + I think the flash side ways in the last season could have been handled better and be less misleading. I love the ending though
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockModel;

    #[test]
    fn prompt_has_four_examples_then_live_thread() {
        let prompt = relevance_prompt("best wine under $20", "Favorite bottle?", "Looking for picks");

        assert_eq!(prompt.matches("EXAMPLE ").count(), 4);
        assert_eq!(prompt.matches("RESPONSE: YES").count(), 1);
        assert_eq!(prompt.matches("RESPONSE: NO").count(), 3);
        assert!(prompt.trim_end().ends_with(
            "QUERY: best wine under $20\nTITLE: Favorite bottle?\nBODY: Looking for picks"
        ));
    }

    #[test]
    fn prompt_keeps_worked_examples_verbatim() {
        let prompt = relevance_prompt("q", "t", "b");

        for sentence in [
            "I didn't know about aphantasia yet while I was reading these books.",
            "One of my favorites is Elantris, that book is beautifully written to me",
            "Daredevil is a show that had great talent out their hearts into what they had",
            "I was satisfied with most of the answers btw",
            "this is because although it discusses good fantasy books",
            "This is a perfect example of a YES since it aims to address",
            "Reading it wouldn't be very helpful to a user trying to find",
            "This is too specific to just talking about Lost.",
        ] {
            assert!(prompt.contains(sentence), "missing: {sentence}");
        }
    }

    #[test]
    fn backoff_doubles_then_caps() {
        let base = Duration::from_secs(2);
        assert_eq!(backoff_for(base, 0), Duration::from_secs(2));
        assert_eq!(backoff_for(base, 3), Duration::from_secs(16));
        assert_eq!(backoff_for(base, 10), MAX_RETRY_BACKOFF);
        assert_eq!(backoff_for(base, u32::MAX), MAX_RETRY_BACKOFF);
    }

    #[test]
    fn prompt_is_deterministic() {
        assert_eq!(relevance_prompt("q", "t", "b"), relevance_prompt("q", "t", "b"));
    }

    #[tokio::test]
    async fn classify_uses_zero_temperature() {
        let model = MockModel::new().respond("YES");
        let classifier = RelevanceClassifier::new(&model);

        let doc = ThreadDocument {
            title: Some("Best fantasy?".into()),
            body: Some("Go".into()),
        };
        let verdict = classifier
            .classify(Some("best fantasy novel books"), &doc)
            .await
            .unwrap();

        assert_eq!(verdict, RelevanceVerdict::Yes);
        let calls = model.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].max_tokens, CLASSIFIER_MAX_TOKENS);
        assert_eq!(calls[0].temperature, 0.0);
    }

    #[tokio::test]
    async fn absent_document_is_still_classified() {
        let model = MockModel::new().respond("NO");
        let classifier = RelevanceClassifier::new(&model);

        let verdict = classifier
            .classify(Some("best fantasy novel books"), &ThreadDocument::absent())
            .await
            .unwrap();

        assert_eq!(verdict, RelevanceVerdict::No);
        let calls = model.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].prompt.contains("TITLE: Title not found"));
        assert!(calls[0].prompt.contains("BODY: Body not found"));
    }

    #[tokio::test]
    async fn model_failure_is_classifier_failure() {
        let model = MockModel::new().fail_with_status(500);
        let classifier = RelevanceClassifier::new(&model);

        let err = classifier
            .classify(Some("q"), &ThreadDocument::absent())
            .await
            .unwrap_err();

        assert!(matches!(err, RankerError::ClassifierFailure(_)), "got {err:?}");
        assert_eq!(model.calls().len(), 1);
    }

    #[tokio::test]
    async fn retries_transient_failures_when_enabled() {
        let model = MockModel::new().fail_with_status(529).respond("YES");
        let classifier =
            RelevanceClassifier::new(&model).with_retries(2, Duration::from_millis(1));

        let verdict = classifier
            .classify(Some("q"), &ThreadDocument::absent())
            .await
            .unwrap();

        assert_eq!(verdict, RelevanceVerdict::Yes);
        assert_eq!(model.calls().len(), 2);
    }

    #[tokio::test]
    async fn does_not_retry_client_errors() {
        let model = MockModel::new().fail_with_status(400).respond("YES");
        let classifier =
            RelevanceClassifier::new(&model).with_retries(2, Duration::from_millis(1));

        let err = classifier
            .classify(Some("q"), &ThreadDocument::absent())
            .await
            .unwrap_err();

        assert!(matches!(err, RankerError::ClassifierFailure(_)));
        assert_eq!(model.calls().len(), 1);
    }
}
