/// A single interview question. The ordinal is the question's position in
/// the fixed sequence, starting at zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub ordinal: usize,
    pub text: String,
}

/// The immutable, ordered list of questions fixed at session start.
#[derive(Debug, Clone)]
pub struct QuestionSet {
    questions: Vec<Question>,
}

impl QuestionSet {
    /// Builds the set from question texts, assigning ordinals in order.
    pub fn from_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let questions = texts
            .into_iter()
            .enumerate()
            .map(|(ordinal, text)| Question {
                ordinal,
                text: text.into(),
            })
            .collect();
        Self { questions }
    }

    pub fn get(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// True when `index` addresses the final question of the sequence.
    pub fn is_last(&self, index: usize) -> bool {
        index + 1 == self.questions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_texts_assigns_ordinals_in_order() {
        let set = QuestionSet::from_texts(["first", "second", "third"]);

        assert_eq!(set.len(), 3);
        assert_eq!(set.get(0).unwrap().ordinal, 0);
        assert_eq!(set.get(0).unwrap().text, "first");
        assert_eq!(set.get(2).unwrap().ordinal, 2);
        assert!(set.get(3).is_none());
    }

    #[test]
    fn test_is_last_only_for_final_index() {
        let set = QuestionSet::from_texts(["a", "b"]);

        assert!(!set.is_last(0));
        assert!(set.is_last(1));
        assert!(!set.is_last(2));
    }
}
