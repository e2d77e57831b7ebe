use chrono::Utc;
use coursely::models::{Course, Lesson, Progress, Purchase, PurchaseStatus};
use coursely::services::catalog::build_course_views;
use coursely::services::certificates::build_certificate_views;
use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

const COURSES: usize = 200;
const LESSONS_PER_COURSE: usize = 40;

fn fixture() -> (Vec<Course>, Vec<Purchase>, Vec<Progress>) {
    let now = Utc::now();

    let courses: Vec<Course> = (0..COURSES)
        .map(|i| Course {
            id: format!("c{}", i),
            title: format!("Course {}", i),
            description: String::new(),
            price: 10_000,
            thumbnail: None,
            category: None,
            published: true,
            lessons: (0..LESSONS_PER_COURSE)
                .map(|l| Lesson {
                    title: format!("Lesson {}", l),
                    video_url: None,
                    content: None,
                    duration_minutes: (l % 3 != 0).then_some(7 + l as u32 % 20),
                })
                .collect(),
            created_at: now,
            updated_at: now,
        })
        .collect();

    // Enrolled in every other course, with varying progress
    let purchases: Vec<Purchase> = courses
        .iter()
        .step_by(2)
        .map(|c| Purchase {
            user_id: "u1".to_string(),
            course_id: c.id.clone(),
            status: PurchaseStatus::Completed,
            reference: format!("ref{}", c.id),
            amount: c.price,
            original_amount: c.price,
            coupon_code: None,
            authorization_url: None,
            created_at: now,
            updated_at: now,
            completed_at: Some(now),
        })
        .collect();

    let progress: Vec<Progress> = purchases
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let mut progress = Progress::new("u1", &p.course_id, now);
            for lesson in 0..(i % (LESSONS_PER_COURSE + 1)) as u32 {
                progress.mark_lesson_complete(lesson, LESSONS_PER_COURSE, now);
            }
            if progress.is_complete() {
                let _ = progress.issue_certificate(now);
            }
            progress
        })
        .collect();

    (courses, purchases, progress)
}

fn benchmark_aggregation(c: &mut Criterion) {
    let (courses, purchases, progress) = fixture();

    let mut group = c.benchmark_group("aggregation");

    group.bench_function("course_views", |b| {
        b.iter(|| build_course_views(black_box(&courses), &purchases, &progress))
    });

    group.bench_function("certificate_views", |b| {
        b.iter(|| build_certificate_views("u1", black_box(&purchases), &courses, &progress))
    });

    group.finish();
}

criterion_group!(benches, benchmark_aggregation);
criterion_main!(benches);
