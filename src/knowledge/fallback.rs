//! Keyword answers used when no model is reachable.

/// Question topic detected by keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topic {
    /// Skills and experience.
    Requirements,
    /// Perks and insurance.
    Benefits,
    /// Company, culture, location.
    Company,
    /// Pay.
    Salary,
    /// Hello.
    Greeting,
    /// Which roles are open.
    PositionInquiry,
    /// Anything else.
    General,
}

/// Ordered keyword table; first match wins.
const TOPIC_KEYWORDS: &[(Topic, &[&str])] = &[
    (
        Topic::Requirements,
        &["requirement", "skill", "experience", "qualification", "need", "must have"],
    ),
    (
        Topic::Salary,
        &["salary", "pay", "compensation", "money", "earn", "income"],
    ),
    (
        Topic::Benefits,
        &["benefit", "insurance", "pto", "vacation", "perk"],
    ),
    (
        Topic::Company,
        &["company", "culture", "team", "office", "location", "remote", "hybrid"],
    ),
    (
        Topic::Greeting,
        &["hello", "hi", "hey", "good morning", "good afternoon", "good evening"],
    ),
    (
        Topic::PositionInquiry,
        &["position", "job", "role", "opening", "available", "hiring", "recruiting"],
    ),
];

/// Classify a question by case-insensitive substring match.
pub fn classify_topic(message: &str) -> Topic {
    let lower = message.to_lowercase();
    TOPIC_KEYWORDS
        .iter()
        .find(|(_, words)| words.iter().any(|w| lower.contains(w)))
        .map(|(topic, _)| *topic)
        .unwrap_or(Topic::General)
}

/// Static description of the flagship opening.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobProfile {
    /// Position title.
    pub title: String,
    /// Employer.
    pub company: String,
    /// Work location.
    pub location: String,
    /// Salary range text.
    pub salary: String,
    /// Requirement bullet points.
    pub requirements: Vec<String>,
    /// Benefit bullet points.
    pub benefits: Vec<String>,
}

impl Default for JobProfile {
    fn default() -> Self {
        let owned =
            |items: &[&str]| -> Vec<String> { items.iter().map(|s| (*s).to_owned()).collect() };
        Self {
            title: "Python Developer".to_owned(),
            company: "TechCorp Solutions".to_owned(),
            location: "Remote/Hybrid (San Francisco, CA)".to_owned(),
            salary: "$120k - $180k based on experience".to_owned(),
            requirements: owned(&[
                "3+ years of Python development experience",
                "Experience with Django, Flask, or FastAPI",
                "Knowledge of SQL databases (PostgreSQL preferred)",
                "Experience with cloud platforms (AWS, Azure, or GCP)",
                "Understanding of RESTful APIs and microservices",
                "Familiarity with Git and version control",
                "Strong problem-solving and communication skills",
            ]),
            benefits: owned(&[
                "Competitive salary ($120k - $180k based on experience)",
                "Comprehensive health, dental, and vision insurance",
                "401(k) with company matching",
                "Flexible work hours and remote work options",
                "Professional development budget",
                "Unlimited PTO",
                "Stock options",
            ]),
        }
    }
}

const INVITE: &str = "I'd be happy to schedule an interview to discuss this opportunity.";

/// Answer a question without a model.
///
/// `positions` lists the currently open roles.
pub fn fallback_answer(message: &str, profile: &JobProfile, positions: &[String]) -> String {
    let bullets = |items: &[String]| {
        items
            .iter()
            .map(|i| format!("\n• {i}"))
            .collect::<String>()
    };
    match classify_topic(message) {
        Topic::Requirements => format!(
            "For the {} position, here are the key requirements:{}\n\nWould you like to know more about the benefits or schedule an interview to discuss this opportunity?",
            profile.title,
            bullets(&profile.requirements)
        ),
        Topic::Benefits => format!(
            "The {} position offers excellent benefits:{}\n\nWould you like to know more about the requirements or schedule an interview to discuss this opportunity?",
            profile.title,
            bullets(&profile.benefits)
        ),
        Topic::Company => format!(
            "{} is a dynamic tech company located in {}. We offer a collaborative environment with opportunities for growth and innovation.\n\nWould you like to know more about the {} position? {INVITE}",
            profile.company, profile.location, profile.title
        ),
        Topic::Salary => format!(
            "The {} position offers {}. This is competitive for the market and based on experience.\n\nWould you like to know more about the requirements? {INVITE}",
            profile.title, profile.salary
        ),
        Topic::Greeting => format!(
            "Hello! I'm here to help you learn more about our {} position. What would you like to know about the role, requirements, benefits, or company culture? {INVITE}",
            profile.title
        ),
        Topic::PositionInquiry => match positions {
            [] => format!(
                "Great question! We currently have a {} position available at {} ({}). {INVITE}",
                profile.title, profile.company, profile.location
            ),
            [only] => format!(
                "Great question! We currently have a {only} position available at {} ({}). This is a full-time role. {INVITE}",
                profile.company, profile.location
            ),
            many => format!(
                "Great question! We currently have {} positions available: {}. Each offers unique challenges and growth opportunities. Which one interests you most? {INVITE}",
                many.len(),
                many.join(", ")
            ),
        },
        Topic::General => format!(
            "Thank you for your interest in our positions! I'd be happy to answer any questions you have about our roles, requirements, benefits, or company culture. What would you like to know more about? {INVITE}"
        ),
    }
}
