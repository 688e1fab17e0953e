//! Static question corpus: the last-resort tier of the sourcing chain.
//!
//! Guarantees the app can always hand out a quiz, even without a generator or database.
//! The size of the `mixed` category caps how many questions a quiz may have.

use rand::{seq::SliceRandom, Rng};

use crate::domain::{normalize_format, QuizQuestion, DEFAULT_QUESTION_COUNT, MIXED_FORMAT};

struct CorpusEntry {
  id: &'static str,
  format: &'static str,
  question: &'static str,
  options: [&'static str; 4],
  correct: &'static str,
  explanation: &'static str,
}

impl CorpusEntry {
  fn to_question(&self) -> QuizQuestion {
    QuizQuestion {
      id: self.id.into(),
      question: self.question.into(),
      options: self.options.iter().map(|o| o.to_string()).collect(),
      correct_answer: self.correct.into(),
      explanation: self.explanation.into(),
    }
  }
}

const CORPUS: &[CorpusEntry] = &[
  // mixed
  CorpusEntry {
    id: "mixed-1", format: "mixed",
    question: "Who scored the first double century in men's ODI cricket?",
    options: ["Virender Sehwag", "Sachin Tendulkar", "Rohit Sharma", "Chris Gayle"],
    correct: "Sachin Tendulkar",
    explanation: "Sachin Tendulkar made 200* against South Africa at Gwalior in February 2010.",
  },
  CorpusEntry {
    id: "mixed-2", format: "mixed",
    question: "Which team won the first men's Cricket World Cup in 1975?",
    options: ["Australia", "England", "West Indies", "India"],
    correct: "West Indies",
    explanation: "Clive Lloyd's West Indies beat Australia in the final at Lord's.",
  },
  CorpusEntry {
    id: "mixed-3", format: "mixed",
    question: "How many legal deliveries make up a standard over?",
    options: ["4", "5", "6", "8"],
    correct: "6",
    explanation: "An over has six legal deliveries; eight-ball overs were dropped from Tests in 1979.",
  },
  CorpusEntry {
    id: "mixed-4", format: "mixed",
    question: "Who has taken the most wickets in men's Test cricket?",
    options: ["Shane Warne", "James Anderson", "Anil Kumble", "Muttiah Muralitharan"],
    correct: "Muttiah Muralitharan",
    explanation: "Muralitharan finished his Test career with exactly 800 wickets.",
  },
  CorpusEntry {
    id: "mixed-5", format: "mixed",
    question: "Which ground is known as the 'Home of Cricket'?",
    options: ["Eden Gardens", "Lord's", "Melbourne Cricket Ground", "The Oval"],
    correct: "Lord's",
    explanation: "Lord's in London is owned by the MCC, the custodian of the Laws of Cricket.",
  },
  CorpusEntry {
    id: "mixed-6", format: "mixed",
    question: "Who captained India to the 1983 World Cup title?",
    options: ["Sunil Gavaskar", "Kapil Dev", "Mohinder Amarnath", "Ravi Shastri"],
    correct: "Kapil Dev",
    explanation: "Kapil Dev's side beat the West Indies by 43 runs in the final.",
  },
  CorpusEntry {
    id: "mixed-7", format: "mixed",
    question: "Who holds the record for the highest individual score in a Test innings?",
    options: ["Matthew Hayden", "Brian Lara", "Don Bradman", "Virender Sehwag"],
    correct: "Brian Lara",
    explanation: "Brian Lara made 400* against England in Antigua in 2004.",
  },
  CorpusEntry {
    id: "mixed-8", format: "mixed",
    question: "What was Don Bradman's career Test batting average?",
    options: ["89.78", "95.14", "99.94", "100.00"],
    correct: "99.94",
    explanation: "Bradman needed four runs in his final innings for a 100 average but was out for a duck.",
  },
  // ipl
  CorpusEntry {
    id: "ipl-1", format: "ipl",
    question: "Which team won the inaugural IPL season in 2008?",
    options: ["Chennai Super Kings", "Rajasthan Royals", "Mumbai Indians", "Deccan Chargers"],
    correct: "Rajasthan Royals",
    explanation: "Shane Warne led Rajasthan Royals to the title, beating Chennai in the final.",
  },
  CorpusEntry {
    id: "ipl-2", format: "ipl",
    question: "Which franchise has MS Dhoni captained to multiple IPL titles?",
    options: ["Chennai Super Kings", "Rising Pune Supergiant", "Mumbai Indians", "Kolkata Knight Riders"],
    correct: "Chennai Super Kings",
    explanation: "Dhoni has led Chennai Super Kings to five IPL titles.",
  },
  CorpusEntry {
    id: "ipl-3", format: "ipl",
    question: "Who holds the record for the highest individual score in an IPL match?",
    options: ["Brendon McCullum", "KL Rahul", "Chris Gayle", "Quinton de Kock"],
    correct: "Chris Gayle",
    explanation: "Chris Gayle struck 175* for Royal Challengers Bangalore against Pune Warriors in 2013.",
  },
  CorpusEntry {
    id: "ipl-4", format: "ipl",
    question: "Who scored the first century in IPL history?",
    options: ["Adam Gilchrist", "Sachin Tendulkar", "Chris Gayle", "Brendon McCullum"],
    correct: "Brendon McCullum",
    explanation: "McCullum hit 158* for Kolkata Knight Riders in the opening match of 2008.",
  },
  CorpusEntry {
    id: "ipl-5", format: "ipl",
    question: "What is the Orange Cap awarded for in an IPL season?",
    options: ["Most wickets", "Most runs", "Best strike rate", "Most catches"],
    correct: "Most runs",
    explanation: "The leading run-scorer wears the Orange Cap; the leading wicket-taker wears Purple.",
  },
  // t20
  CorpusEntry {
    id: "t20-1", format: "t20",
    question: "Which team won the first ICC men's T20 World Cup in 2007?",
    options: ["Pakistan", "India", "Australia", "Sri Lanka"],
    correct: "India",
    explanation: "India beat Pakistan by five runs in the final in Johannesburg.",
  },
  CorpusEntry {
    id: "t20-2", format: "t20",
    question: "Who hit six sixes in an over at the 2007 T20 World Cup?",
    options: ["Yuvraj Singh", "Chris Gayle", "Kieron Pollard", "Herschelle Gibbs"],
    correct: "Yuvraj Singh",
    explanation: "Yuvraj Singh hit Stuart Broad for six sixes at Durban.",
  },
  CorpusEntry {
    id: "t20-3", format: "t20",
    question: "How many overs does each side bat in a T20 match?",
    options: ["10", "20", "40", "50"],
    correct: "20",
    explanation: "Twenty overs per side gives the format its name.",
  },
  // odi
  CorpusEntry {
    id: "odi-1", format: "odi",
    question: "Which team won the 2019 men's ODI World Cup?",
    options: ["New Zealand", "India", "England", "Australia"],
    correct: "England",
    explanation: "England won the final against New Zealand on boundary count after a tied Super Over.",
  },
  CorpusEntry {
    id: "odi-2", format: "odi",
    question: "Who holds the record for the highest individual score in men's ODIs?",
    options: ["Martin Guptill", "Virender Sehwag", "Rohit Sharma", "Chris Gayle"],
    correct: "Rohit Sharma",
    explanation: "Rohit Sharma made 264 against Sri Lanka at Eden Gardens in 2014.",
  },
  CorpusEntry {
    id: "odi-3", format: "odi",
    question: "Which team won the 2011 men's ODI World Cup?",
    options: ["Sri Lanka", "India", "Australia", "Pakistan"],
    correct: "India",
    explanation: "India beat Sri Lanka at the Wankhede Stadium, Dhoni finishing with a six.",
  },
  // test
  CorpusEntry {
    id: "test-1", format: "test",
    question: "Which two teams played the first official Test match in 1877?",
    options: ["England and South Africa", "Australia and England", "England and India", "Australia and West Indies"],
    correct: "Australia and England",
    explanation: "The first Test was played at the Melbourne Cricket Ground in March 1877.",
  },
  CorpusEntry {
    id: "test-2", format: "test",
    question: "Who was the first batter to reach 10,000 Test runs?",
    options: ["Allan Border", "Sunil Gavaskar", "Sachin Tendulkar", "Javed Miandad"],
    correct: "Sunil Gavaskar",
    explanation: "Sunil Gavaskar passed 10,000 Test runs in 1987 against Pakistan.",
  },
  CorpusEntry {
    id: "test-3", format: "test",
    question: "Over how many days is a standard men's Test match scheduled?",
    options: ["3", "4", "5", "6"],
    correct: "5",
    explanation: "Modern men's Tests are scheduled for five days.",
  },
];

const fn same_str(a: &str, b: &str) -> bool {
  let (a, b) = (a.as_bytes(), b.as_bytes());
  if a.len() != b.len() {
    return false;
  }
  let mut i = 0;
  while i < a.len() {
    if a[i] != b[i] {
      return false;
    }
    i += 1;
  }
  true
}

const fn mixed_len() -> usize {
  let mut n = 0;
  let mut i = 0;
  while i < CORPUS.len() {
    if same_str(CORPUS[i].format, MIXED_FORMAT) {
      n += 1;
    }
    i += 1;
  }
  n
}

/// Largest quiz the corpus can always fill: every format falls back to `mixed`.
pub const MAX_QUESTION_COUNT: usize = mixed_len();

const _: () = assert!(DEFAULT_QUESTION_COUNT >= 1 && DEFAULT_QUESTION_COUNT <= MAX_QUESTION_COUNT);

/// Corpus questions for `format`, shuffled, exactly `count` long.
/// Falls back to the whole `mixed` category when the format has fewer than `count` entries.
pub fn fetch_corpus(format: &str, count: usize) -> Vec<QuizQuestion> {
  fetch_corpus_with(&mut rand::thread_rng(), format, count)
}

pub fn fetch_corpus_with<R: Rng + ?Sized>(rng: &mut R, format: &str, count: usize) -> Vec<QuizQuestion> {
  let format = normalize_format(format);
  let mut candidates: Vec<&CorpusEntry> = CORPUS.iter().filter(|e| e.format == format).collect();
  if candidates.len() < count {
    candidates = CORPUS.iter().filter(|e| e.format == MIXED_FORMAT).collect();
  }
  candidates.shuffle(rng);
  candidates.into_iter().take(count).map(CorpusEntry::to_question).collect()
}
