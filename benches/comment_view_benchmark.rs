//! 조회 뷰 벤치마크: 작성자 중복 제거 + 페이지 구간 계산
//!
//! - 앞쪽 페이지는 조기 종료 덕분에 전체 스캔 없이 끝나야 함
//! - 뒤쪽 페이지는 중복 작성자 비율에 따라 스캔 길이가 늘어남
//! - 쓰기 시점 중복 제거(자연 키)는 별도로 측정

use chrono::{Duration, TimeZone, Utc};
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use comment_vault_lib::domain::comment::YoutubeComment;
use comment_vault_lib::domain::comment_view::build_page;
use comment_vault_lib::domain::constants::view::PAGE_SIZE;
use comment_vault_lib::domain::deduplication::deduplicate_comments;

/// `count`개의 댓글, 작성자는 `authors`명이 돌아가며 작성 (최신순 정렬)
fn rows(count: usize, authors: usize) -> Vec<YoutubeComment> {
    let now = Utc.with_ymd_and_hms(2024, 7, 12, 12, 0, 0).unwrap();
    (0..count)
        .map(|i| {
            let author = format!("UCauthor{}", i % authors);
            YoutubeComment {
                video_id: "bench".to_string(),
                comment_id: format!("c{i}"),
                author_channel_id: Some(author.clone()),
                author_display_name: author,
                author_channel_url: "https://www.youtube.com".to_string(),
                comment_text: "댓글 본문은 미리보기 길이보다 훨씬 길게 만들어서 자르는 비용도 함께 측정합니다".repeat(2),
                published_at: now - Duration::seconds(i as i64),
                retrieved_at: now,
            }
        })
        .collect()
}

fn bench_page_builder(c: &mut Criterion) {
    let mut group = c.benchmark_group("comment_page_builder");

    for (count, authors) in [(10_000, 10_000), (10_000, 1_000), (50_000, 5_000)] {
        let data = rows(count, authors);
        let last_page = u32::try_from(authors.div_ceil(PAGE_SIZE)).unwrap_or(u32::MAX);

        group.bench_with_input(
            BenchmarkId::new("first_page", format!("{count}x{authors}")),
            &data,
            |b, data| b.iter(|| build_page("bench", black_box(1), PAGE_SIZE, data.iter())),
        );

        group.bench_with_input(
            BenchmarkId::new("last_page", format!("{count}x{authors}")),
            &data,
            |b, data| b.iter(|| build_page("bench", black_box(last_page), PAGE_SIZE, data.iter())),
        );
    }

    group.finish();
}

fn bench_deduplication(c: &mut Criterion) {
    let mut data = rows(20_000, 20_000);
    // 절반은 같은 자연 키로 다시 등장
    data.extend(rows(10_000, 10_000));

    c.bench_function("deduplicate_comments_30k", |b| {
        b.iter(|| deduplicate_comments(black_box(data.clone())))
    });
}

criterion_group!(benches, bench_page_builder, bench_deduplication);
criterion_main!(benches);
