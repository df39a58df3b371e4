use rand::seq::SliceRandom;
use rand::Rng;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const TEMPLATE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Question and answer template images discovered once at startup.
#[derive(Debug, Clone, Default)]
pub struct TemplateSet {
    questions: Vec<PathBuf>,
    answers: Vec<PathBuf>,
}

impl TemplateSet {
    pub fn new(questions: Vec<PathBuf>, answers: Vec<PathBuf>) -> Self {
        Self { questions, answers }
    }

    pub fn discover(question_dir: &Path, answer_dir: &Path) -> Self {
        let questions = scan_template_dir(question_dir);
        let answers = scan_template_dir(answer_dir);
        info!(
            "templates: {} question, {} answer",
            questions.len(),
            answers.len()
        );
        Self { questions, answers }
    }

    pub fn questions(&self) -> &[PathBuf] {
        &self.questions
    }

    pub fn answers(&self) -> &[PathBuf] {
        &self.answers
    }

    pub fn pick_question_template<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<PathBuf> {
        self.questions.choose(rng).cloned()
    }

    /// Answer template paired with `question_template`: the one sharing its
    /// file name, otherwise a random answer template, otherwise none.
    pub fn answer_template_for<R: Rng + ?Sized>(
        &self,
        question_template: &Path,
        rng: &mut R,
    ) -> Option<PathBuf> {
        let wanted = question_template.file_name();
        if let Some(found) = wanted.and_then(|wanted| {
            self.answers
                .iter()
                .find(|candidate| candidate.file_name() == Some(wanted))
        }) {
            return Some(found.clone());
        }
        let picked = self.answers.choose(rng).cloned();
        if let Some(path) = picked.as_deref() {
            debug!(
                "no answer template matches {}, picked {}",
                question_template.display(),
                path.display()
            );
        }
        picked
    }
}

fn scan_template_dir(dir: &Path) -> Vec<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            debug!("template directory unavailable: {} ({})", dir.display(), err);
            return Vec::new();
        }
    };

    let mut templates = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!("failed to read entry in {}: {}", dir.display(), err);
                continue;
            }
        };
        let path = entry.path();
        if path.is_file() && has_template_extension(&path) {
            templates.push(path);
        }
    }
    templates.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    templates
}

fn has_template_extension(path: &Path) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .map(|ext| {
            TEMPLATE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{RngCore, SeedableRng};
    use tempfile::tempdir;

    /// Rng that fails the test if anything draws from it.
    pub(crate) struct NoRandom;

    impl RngCore for NoRandom {
        fn next_u32(&mut self) -> u32 {
            panic!("randomness was not expected");
        }

        fn next_u64(&mut self) -> u64 {
            panic!("randomness was not expected");
        }

        fn fill_bytes(&mut self, _dest: &mut [u8]) {
            panic!("randomness was not expected");
        }

        fn try_fill_bytes(&mut self, _dest: &mut [u8]) -> Result<(), rand::Error> {
            panic!("randomness was not expected");
        }
    }

    #[test]
    fn discovery_filters_extensions_case_insensitively() {
        let dir = tempdir().expect("tempdir");
        for name in ["b.PNG", "a.jpg", "c.JpEg", "notes.txt", "d.gif"] {
            fs::write(dir.path().join(name), b"x").expect("write");
        }
        fs::create_dir(dir.path().join("nested.png")).expect("mkdir");

        let set = TemplateSet::discover(dir.path(), &dir.path().join("missing"));
        let names: Vec<_> = set
            .questions()
            .iter()
            .filter_map(|path| path.file_name().and_then(OsStr::to_str))
            .collect();
        assert_eq!(names, vec!["a.jpg", "b.PNG", "c.JpEg"]);
        assert!(set.answers().is_empty());
    }

    #[test]
    fn missing_directories_give_empty_sets() {
        let set = TemplateSet::discover(Path::new("/nonexistent/q"), Path::new("/nonexistent/a"));
        assert!(set.questions().is_empty());
        assert!(set.answers().is_empty());
        let mut rng = StdRng::seed_from_u64(7);
        assert!(set.pick_question_template(&mut rng).is_none());
    }

    #[test]
    fn exact_file_name_match_wins_without_randomness() {
        let set = TemplateSet::new(
            vec![PathBuf::from("/q/3.jpg")],
            vec![
                PathBuf::from("/a/1.jpg"),
                PathBuf::from("/a/3.jpg"),
                PathBuf::from("/a/5.jpg"),
            ],
        );
        let chosen = set
            .answer_template_for(Path::new("/q/3.jpg"), &mut NoRandom)
            .expect("answer template");
        assert_eq!(chosen, PathBuf::from("/a/3.jpg"));
    }

    #[test]
    fn unmatched_question_picks_a_random_answer() {
        let answers = vec![PathBuf::from("/a/1.jpg"), PathBuf::from("/a/2.jpg")];
        let set = TemplateSet::new(vec![PathBuf::from("/q/9.jpg")], answers.clone());
        let mut rng = StdRng::seed_from_u64(42);
        let chosen = set
            .answer_template_for(Path::new("/q/9.jpg"), &mut rng)
            .expect("answer template");
        assert!(answers.contains(&chosen));
    }

    #[test]
    fn question_path_without_file_name_still_gets_an_answer() {
        let answers = vec![PathBuf::from("/a/1.jpg"), PathBuf::from("/a/2.jpg")];
        let set = TemplateSet::new(vec![PathBuf::from("/q/1.jpg")], answers.clone());
        let mut rng = StdRng::seed_from_u64(3);
        for question in ["/q/..", "/"] {
            let chosen = set
                .answer_template_for(Path::new(question), &mut rng)
                .expect("answer template");
            assert!(answers.contains(&chosen), "{} -> {:?}", question, chosen);
        }
    }

    #[test]
    fn empty_answer_set_yields_none() {
        let set = TemplateSet::new(vec![PathBuf::from("/q/1.jpg")], Vec::new());
        let mut rng = StdRng::seed_from_u64(1);
        assert!(set.answer_template_for(Path::new("/q/1.jpg"), &mut rng).is_none());
    }
}
