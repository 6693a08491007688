use std::ops::RangeInclusive;
use std::sync::OnceLock;

use chrono::{Duration, Local, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::catalog::{
    Antecedent, Area, Behaviour, Consequence, Effectiveness, FunctionPrimary, FunctionSecondary,
    FunctionalHypothesis, Outcome, RiskLevel, Setting, StaffRole, SupportType, WindowOfTolerance,
    BASIC_CONTEXT_DEFAULT, HOW_TO_RESPOND_DEFAULT,
};
use crate::models::{Incident, IncidentDraft, Outcomes, Staff, StaffRef, Student};
use crate::schedule;

pub const HIGH_FREQUENCY_STUDENT: &str = "stu_jp_high";
const RICH_INCIDENTS: u32 = 15;
const INCIDENTS_PER_STUDENT: u32 = 3;

#[derive(Debug, Clone)]
pub struct MockData {
    pub staff: Vec<Staff>,
    pub students: Vec<Student>,
    pub incidents: Vec<Incident>,
}

static MOCK_DATA: OnceLock<MockData> = OnceLock::new();

/// Demo data for this process. Generated on the first call only; the seed
/// of later calls is ignored so incident ids stay stable for the whole run.
pub fn cached(seed: Option<u64>) -> &'static MockData {
    MOCK_DATA.get_or_init(|| {
        let today = Local::now().date_naive();
        let data = match seed {
            Some(seed) => generate(&mut StdRng::seed_from_u64(seed), today),
            None => generate(&mut rand::rng(), today),
        };
        tracing::debug!(
            incidents = data.incidents.len(),
            seeded = seed.is_some(),
            "generated mock data"
        );
        data
    })
}

pub fn generate<R: Rng + ?Sized>(rng: &mut R, today: NaiveDate) -> MockData {
    let staff = staff_roster();
    let students = student_roster();
    let mut incidents = Vec::new();

    for index in 1..=RICH_INCIDENTS {
        incidents.push(rich_incident(rng, today, index));
    }
    incidents.push(fix_up_incident(rng, today));

    for student in students.iter().filter(|s| s.id != HIGH_FREQUENCY_STUDENT) {
        for _ in 0..INCIDENTS_PER_STUDENT {
            incidents.push(basic_incident(rng, today, &student.id));
        }
    }

    MockData {
        staff,
        students,
        incidents,
    }
}

pub fn staff_roster() -> Vec<Staff> {
    let member = |id: &str, name: &str, role: StaffRole, special: bool| Staff {
        id: id.to_string(),
        name: name.to_string(),
        role,
        active: true,
        special,
    };

    vec![
        member("s1", "Emily Jones (JP)", StaffRole::Jp, false),
        member("s2", "Daniel Lee (PY)", StaffRole::Py, false),
        member("s3", "Sarah Chen (SY)", StaffRole::Sy, false),
        member("s4", "Admin User (ADM)", StaffRole::Adm, false),
        member("s_trt", "TRT", StaffRole::Trt, true),
        member("s_sso", "External SSO", StaffRole::Sso, true),
    ]
}

pub fn student_roster() -> Vec<Student> {
    let student = |id: &str,
                   name: &str,
                   area: Area,
                   grade: &str,
                   teacher: &str,
                   edid: &str,
                   dob: (i32, u32, u32)| Student {
        id: id.to_string(),
        name: name.to_string(),
        area,
        grade: grade.to_string(),
        teacher: teacher.to_string(),
        edid: edid.to_string(),
        dob: NaiveDate::from_ymd_opt(dob.0, dob.1, dob.2).unwrap_or_default(),
    };

    vec![
        student(
            HIGH_FREQUENCY_STUDENT,
            "Marcus A.",
            Area::Jp,
            "R",
            "Smith",
            "JP001A",
            (2019, 3, 15),
        ),
        student("stu_jp_low", "Chloe T.", Area::Jp, "Y2", "Davids", "JP002T", (2017, 11, 20)),
        student("stu_py_high", "Noah K.", Area::Py, "Y5", "Williams", "PY003K", (2014, 7, 1)),
        student("stu_py_low", "Leah S.", Area::Py, "Y6", "Brown", "PY004S", (2013, 9, 10)),
        student("stu_sy_high", "Ethan B.", Area::Sy, "Y9", "Green", "SY005B", (2010, 1, 25)),
        student("stu_sy_low", "Mia P.", Area::Sy, "Y10", "Clark", "SY006P", (2009, 4, 5)),
    ]
}

fn pick<T: Copy, R: Rng + ?Sized>(rng: &mut R, items: &[T]) -> T {
    items[rng.random_range(0..items.len())]
}

fn risk<R: Rng + ?Sized>(rng: &mut R, range: RangeInclusive<u8>) -> RiskLevel {
    let levels: Vec<RiskLevel> = RiskLevel::all()
        .filter(|level| range.contains(&level.get()))
        .collect();
    pick(rng, &levels)
}

fn days_ago<R: Rng + ?Sized>(rng: &mut R, today: NaiveDate, max: i64) -> NaiveDate {
    today - Duration::days(rng.random_range(1..=max))
}

/// Random outcome flags for a completed mock incident; at least one is set.
pub fn random_outcomes<R: Rng + ?Sized>(rng: &mut R) -> Outcomes {
    let mut outcomes = Outcomes::default();
    for outcome in Outcome::ALL {
        outcomes.set(*outcome, rng.random_bool(0.5));
    }
    if !outcomes.any() {
        outcomes.set(pick(rng, Outcome::ALL), true);
    }
    outcomes
}

fn rich_incident<R: Rng + ?Sized>(rng: &mut R, today: NaiveDate, index: u32) -> Incident {
    let date = days_ago(rng, today, 45);
    let time = schedule::random_school_time(rng);
    let is_high_risk = rng.random_range(0..3) < 2;

    let behaviour = if index % 3 == 0 {
        pick(
            rng,
            &[Behaviour::VerbalRefusal, Behaviour::Elopement, Behaviour::StaffAggression],
        )
    } else {
        pick(rng, Behaviour::ALL)
    };

    let draft = IncidentDraft {
        student_id: HIGH_FREQUENCY_STUDENT.to_string(),
        date,
        time,
        behaviour,
        antecedent: pick(
            rng,
            &[
                Antecedent::TaskDemand,
                Antecedent::LimitSetting,
                Antecedent::AdultDemand,
                Antecedent::PeerInteraction,
                Antecedent::Transition,
            ],
        ),
        setting: pick(
            rng,
            &[Setting::Classroom, Setting::Yard, Setting::Gate, Setting::Admin],
        ),
        support_type: if is_high_risk {
            pick(rng, &[SupportType::OneToOne, SupportType::SmallGroup])
        } else {
            pick(rng, SupportType::ALL)
        },
        risk_level: if is_high_risk {
            risk(rng, 4..=5)
        } else {
            risk(rng, 1..=3)
        },
        consequence: pick(rng, Consequence::ALL),
        func_hypothesis: pick(
            rng,
            &[FunctionalHypothesis::AvoidEscape, FunctionalHypothesis::SeekGet],
        ),
        func_primary: Some(pick(rng, FunctionPrimary::ALL)),
        func_secondary: Some(pick(rng, FunctionSecondary::ALL)),
        effectiveness: if is_high_risk {
            pick(rng, &[Effectiveness::Ineffective, Effectiveness::Worsened])
        } else {
            pick(
                rng,
                &[Effectiveness::HighlyEffective, Effectiveness::ModeratelyEffective],
            )
        },
        window_of_tolerance: if is_high_risk {
            WindowOfTolerance::HyperAroused
        } else {
            pick(rng, WindowOfTolerance::ALL)
        },
        context: if is_high_risk {
            format!(
                "HIGH-DETAIL LOG: {} during {}. Requires immediate follow-up.",
                behaviour,
                schedule::format_time(time)
            )
        } else {
            BASIC_CONTEXT_DEFAULT.to_string()
        },
        notes: Some(format!("Staff noted lack of sleep prior to incident {index}.")),
        how_to_respond: if is_high_risk {
            "Use a 5-step break card system.".to_string()
        } else {
            HOW_TO_RESPOND_DEFAULT.to_string()
        },
        logged_by: StaffRef::bare("s1"),
        other_staff: if index % 5 == 0 {
            vec![StaffRef::named("s_trt", "Jane Doe")]
        } else {
            Vec::new()
        },
    };

    let outcomes = if is_high_risk {
        random_outcomes(rng)
    } else {
        Outcomes::default()
    };
    draft.into_incident(is_high_risk, outcomes)
}

/// Low-arousal, uncompleted record for the high-frequency student, timed a
/// few minutes before a random point in the day.
fn fix_up_incident<R: Rng + ?Sized>(rng: &mut R, today: NaiveDate) -> Incident {
    let time = schedule::random_school_time(rng) - Duration::minutes(rng.random_range(1..=5));

    IncidentDraft {
        student_id: HIGH_FREQUENCY_STUDENT.to_string(),
        date: days_ago(rng, today, 45),
        time,
        behaviour: Behaviour::OutOfSeat,
        antecedent: pick(rng, Antecedent::ALL),
        setting: Setting::SpillOut,
        support_type: pick(rng, SupportType::ALL),
        risk_level: risk(rng, 1..=5),
        consequence: pick(rng, Consequence::ALL),
        func_hypothesis: pick(rng, FunctionalHypothesis::ALL),
        func_primary: Some(pick(rng, FunctionPrimary::ALL)),
        func_secondary: Some(pick(rng, FunctionSecondary::ALL)),
        effectiveness: pick(rng, Effectiveness::ALL),
        window_of_tolerance: WindowOfTolerance::HypoAroused,
        context: "Pacing outside the classroom; logged without further detail.".to_string(),
        notes: None,
        how_to_respond: HOW_TO_RESPOND_DEFAULT.to_string(),
        logged_by: StaffRef::bare("s1"),
        other_staff: Vec::new(),
    }
    .into_incident(false, Outcomes::default())
}

fn basic_incident<R: Rng + ?Sized>(rng: &mut R, today: NaiveDate, student_id: &str) -> Incident {
    IncidentDraft {
        student_id: student_id.to_string(),
        date: days_ago(rng, today, 60),
        time: schedule::random_school_time(rng),
        behaviour: pick(rng, Behaviour::ALL),
        antecedent: pick(rng, Antecedent::ALL),
        setting: pick(rng, Setting::ALL),
        support_type: pick(rng, SupportType::ALL),
        risk_level: risk(rng, 1..=5),
        consequence: pick(rng, Consequence::ALL),
        func_hypothesis: pick(rng, FunctionalHypothesis::ALL),
        func_primary: Some(pick(rng, FunctionPrimary::ALL)),
        func_secondary: Some(pick(rng, FunctionSecondary::ALL)),
        effectiveness: pick(rng, Effectiveness::ALL),
        window_of_tolerance: pick(rng, WindowOfTolerance::ALL),
        context: BASIC_CONTEXT_DEFAULT.to_string(),
        notes: None,
        how_to_respond: HOW_TO_RESPOND_DEFAULT.to_string(),
        logged_by: StaffRef::bare(pick(rng, &["s1", "s2", "s3"])),
        other_staff: Vec::new(),
    }
    .into_incident(false, Outcomes::default())
}
