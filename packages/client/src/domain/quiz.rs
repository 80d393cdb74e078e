//! O/X quiz, collected answers, reveal flag and ranking.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{
    error::SignalError,
    signal::{OutboundSignal, QuizSignal, RankSignal, ResetAnswer, RevealAnswer, UserAnswer},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    pub problem: String,
    /// `true` is O, `false` is X
    pub answer: bool,
    pub total_count: u32,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rank {
    pub fan_id: u64,
    pub score: u32,
}

#[derive(Debug, Default)]
pub struct QuizRankCoordinator {
    current: Option<Quiz>,
    answers: HashMap<u64, bool>,
    revealed: bool,
    ranks: Option<Vec<Rank>>,
}

impl QuizRankCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_quiz(&self, quiz: Quiz) -> Result<OutboundSignal, SignalError> {
        OutboundSignal::broadcast(&QuizSignal { quiz: Some(quiz) })
    }

    pub fn clear_quiz(&self) -> Result<OutboundSignal, SignalError> {
        OutboundSignal::broadcast(&QuizSignal { quiz: None })
    }

    /// Replace the current quiz. A new question hides the answer again.
    pub fn apply_quiz(&mut self, quiz: Option<Quiz>) {
        if quiz != self.current {
            self.revealed = false;
        }
        self.current = quiz;
    }

    pub fn submit_answer(&self, user_id: u64, answer: bool) -> Result<OutboundSignal, SignalError> {
        OutboundSignal::broadcast(&UserAnswer { user_id, answer })
    }

    pub fn apply_user_answer(&mut self, user_id: u64, answer: bool) {
        self.answers.insert(user_id, answer);
    }

    pub fn reset_answers(&self) -> Result<OutboundSignal, SignalError> {
        OutboundSignal::broadcast(&ResetAnswer {})
    }

    pub fn apply_reset(&mut self) {
        self.answers.clear();
    }

    pub fn set_reveal(&self, revealed: bool) -> Result<OutboundSignal, SignalError> {
        OutboundSignal::broadcast(&RevealAnswer { revealed })
    }

    pub fn apply_reveal(&mut self, revealed: bool) {
        self.revealed = revealed;
    }

    pub fn set_ranks(&self, ranks: Vec<Rank>) -> Result<OutboundSignal, SignalError> {
        OutboundSignal::broadcast(&RankSignal { ranks })
    }

    pub fn apply_ranks(&mut self, ranks: Vec<Rank>) {
        self.ranks = Some(ranks);
    }

    pub fn current(&self) -> Option<&Quiz> {
        self.current.as_ref()
    }

    pub fn answer_of(&self, user_id: u64) -> Option<bool> {
        self.answers.get(&user_id).copied()
    }

    pub fn answered_count(&self) -> usize {
        self.answers.len()
    }

    /// Users whose answer matches the current quiz, sorted
    pub fn correct_user_ids(&self) -> Vec<u64> {
        let Some(quiz) = &self.current else {
            return Vec::new();
        };
        let mut ids: Vec<u64> = self
            .answers
            .iter()
            .filter(|(_, answer)| **answer == quiz.answer)
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();
        ids
    }

    pub fn is_revealed(&self) -> bool {
        self.revealed
    }

    pub fn ranks(&self) -> Option<&[Rank]> {
        self.ranks.as_deref()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
