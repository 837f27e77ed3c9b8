//! Compiled reference grammar.
//!
//! The grammar follows GitHub URL and shorthand conventions. Where a boundary
//! has to hold after a match, it is written as a trailing class that also
//! accepts the end of text, e.g. `(?:[^\d#/]|$)`.

use regex::{Regex, RegexBuilder};

/// `owner/name` as it appears in GitHub paths.
const REPO: &str = r"[A-Za-z0-9][-0-9a-zA-Z]*/[A-Za-z0-9][-_0-9a-zA-Z\.]*";
const LOGIN: &str = r"[A-Za-z0-9][-0-9a-zA-Z]*";
const ANCHOR: &str = r"[-_0-9a-zA-Z\.%#/:]+-\d+";

#[derive(Debug, Clone)]
pub struct Patterns {
    // Issue_PR predicates
    pub discussion_anchor: Regex,
    pub files_review_anchor: Regex,
    pub review_anchor: Regex,
    pub issue_comment_anchor: Regex,
    pub pull_path: Regex,
    pub pull_anchor_path: Regex,
    pub issue_path: Regex,
    pub issue_anchor_path: Regex,
    pub hash_number: Regex,

    // Issue_PR extraction
    pub issue_repo: Regex,
    pub issue_number: Regex,
    pub review_comment_id: Regex,
    pub review_id: Regex,
    pub issue_comment_id: Regex,
    pub anchor: Regex,
    pub pr_shorthand: Regex,
    pub issue_shorthand: Regex,
    pub bare_shorthand: Regex,
    pub repo_shorthand: Regex,
    pub shorthand_number: Regex,
    pub numbers: Regex,

    // SHA
    pub commit_path: Regex,
    pub commit_repo: Regex,
    pub full_sha: Regex,
    pub abbrev_sha: Regex,

    // Actor and Repo
    pub github_host: Regex,
    pub profile_login: Regex,
    pub repo_link: Regex,

    // Branch_Tag_GHDir
    pub tree: Regex,
    pub tree_repo: Regex,
    pub tree_ref: Regex,

    // CommitComment, Gollum, Release and plain links
    pub commit_comment: Regex,
    pub commit_comment_id: Regex,
    pub commit_comment_sha: Regex,
    pub wiki: Regex,
    pub wiki_repo: Regex,
    pub release_tag: Regex,
    pub any_repo: Regex,
    pub login: Regex,
}

fn re(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(pattern)
}

fn re_nocase(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern).case_insensitive(true).build()
}

impl Patterns {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            discussion_anchor: re(r"#discussion_r\d+(?:[^\d#/]|$)")?,
            files_review_anchor: re(r"/files(?:/[0-9a-fA-F]{40})?#r\d+(?:[^\d#/]|$)")?,
            review_anchor: re(r"#pullrequestreview-\d+(?:[^\d#/]|$)")?,
            issue_comment_anchor: re(r"#issuecomment-\d+(?:[^\d#/]|$)")?,
            pull_path: re(r"/pull/\d+(?:[^\d#/]|$)")?,
            pull_anchor_path: re(&format!(r"/pull/\d+#{ANCHOR}(?:[^\d/]|$)"))?,
            issue_path: re(r"/issues/\d+(?:[^\d#/]|$)")?,
            issue_anchor_path: re(&format!(r"/issues/\d+#{ANCHOR}(?:[^\d/]|$)"))?,
            hash_number: re(r"#0*[1-9][0-9]*(?:[^\d/#a-z]|$)")?,

            issue_repo: re(&format!(r"com/({REPO})/(?:issues|pull)"))?,
            issue_number: re(r"(?:issues|pull)/(\d+)")?,
            review_comment_id: re(r"#(?:discussion_)?r(\d+)")?,
            review_id: re(r"#pullrequestreview-(\d+)")?,
            issue_comment_id: re(r"#issuecomment-(\d+)")?,
            anchor: re(&format!(r"#({ANCHOR})"))?,
            pr_shorthand: re_nocase(r"^(?:Pull\s?Request|PR)#0*[1-9][0-9]*$")?,
            issue_shorthand: re_nocase(r"^Issues?#0*[1-9][0-9]*$")?,
            bare_shorthand: re(r"^#0*[1-9][0-9]*$")?,
            repo_shorthand: re(&format!(r"^({REPO})#\d+$"))?,
            shorthand_number: re(r"#(0*[1-9][0-9]*)")?,
            numbers: re(r"#(\d+)")?,

            commit_path: re(r"/commits?/([0-9a-fA-F]{40})$")?,
            commit_repo: re(&format!(r"com/({REPO})/(?:commit|pull)"))?,
            full_sha: re(r"^[0-9a-fA-F]{40}$")?,
            abbrev_sha: re(r"([0-9a-fA-F]{7})$")?,

            github_host: re(r"github(?:-redirect\.dependabot)?\.com/")?,
            profile_login: re(&format!(r"com/({LOGIN})(?:[^-A-Za-z0-9/]|$)"))?,
            repo_link: re(&format!(r"com/({REPO})(?:[^-_A-Za-z0-9\./]|$)"))?,

            tree: re(r"/tree/\S+")?,
            tree_repo: re(&format!(r"com/({REPO})(?:[^-_A-Za-z0-9\.]|$)"))?,
            tree_ref: re(r"tree/([^\s#]+)$")?,

            commit_comment: re(r"commit/[0-9a-fA-F]{40}#commitcomment-\d+(?:[^\d#/]|$)")?,
            commit_comment_id: re(r"#commitcomment-(\d+)")?,
            commit_comment_sha: re(r"commit/([0-9a-fA-F]{40})")?,
            wiki: re(r"/wiki/")?,
            wiki_repo: re(&format!(r"com/({REPO})/wiki"))?,
            release_tag: re(r"/releases/tag/(\S+)")?,
            any_repo: re(&format!(r"com/({REPO})"))?,
            login: re(&format!(r"^{LOGIN}$"))?,
        })
    }
}

/// First capture group of the first match.
#[must_use]
pub fn capture<'t>(pattern: &Regex, text: &'t str) -> Option<&'t str> {
    pattern
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// First capture group of every match.
#[must_use]
pub fn capture_all(pattern: &Regex, text: &str) -> Vec<String> {
    pattern
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[expect(clippy::expect_used, reason = "Built-in grammar compiles")]
    fn patterns() -> Patterns {
        Patterns::new().expect("grammar compiles")
    }

    #[test]
    fn boundaries_reject_longer_paths() {
        let p = patterns();
        assert!(p.pull_path.is_match("https://github.com/xxx/xx/pull/3221"));
        assert!(!p.pull_path.is_match("https://github.com/xxx/xx/pull/3221/files"));
        assert!(!p.pull_path.is_match("https://github.com/redis/redis/pull/10587#event-1"));
        assert!(p.pull_anchor_path.is_match("https://github.com/redis/redis/pull/10587#event-6444202459"));
        assert!(p.hash_number.is_match("#782"));
        assert!(!p.hash_number.is_match("#782abc"));
    }

    #[test]
    fn captures_repo_and_ids() {
        let p = patterns();
        let text = "https://github.com/redis/redis/pull/10502#discussion_r839879682";
        assert_eq!(capture(&p.issue_repo, text), Some("redis/redis"));
        assert_eq!(capture(&p.issue_number, text), Some("10502"));
        assert_eq!(capture(&p.review_comment_id, text), Some("839879682"));

        let files = "https://github.com/redis/redis/pull/10502/files#r839879682";
        assert_eq!(capture(&p.review_comment_id, files), Some("839879682"));
    }

    #[test]
    fn profile_login_stops_at_path_segments() {
        let p = patterns();
        assert_eq!(capture(&p.profile_login, "https://github.com/birdflyi"), Some("birdflyi"));
        assert_eq!(capture(&p.profile_login, "https://github.com/birdflyi/test"), None);
    }

    #[test]
    fn numbers_collects_every_hash_number() {
        let p = patterns();
        assert_eq!(capture_all(&p.numbers, "BUG#32134875 and #7"), vec!["32134875", "7"]);
    }
}
