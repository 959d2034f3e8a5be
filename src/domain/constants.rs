//! 댓글 도메인 상수들
//!
//! YouTube Data API 특성과 화면 표시 정책 상수를 한 곳에 모읍니다.

/// YouTube Data API (commentThreads) 특성 상수들
pub mod youtube {
    /// 기본 API 주소
    pub const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";

    /// `maxResults` 상한 (API 제약)
    pub const MAX_RESULTS_LIMIT: u32 = 100;

    /// 작성자 이름이 없을 때 쓰는 값
    pub const UNKNOWN_AUTHOR: &str = "Unknown";

    /// 채널 ID 기반 URL 접두사
    pub const CHANNEL_URL_PREFIX: &str = "https://www.youtube.com/channel/";

    /// 채널 정보가 전혀 없을 때의 대체 URL
    pub const FALLBACK_CHANNEL_URL: &str = "https://www.youtube.com";
}

/// 조회(View) 정책 상수들
pub mod view {
    /// 한 페이지에 담기는 댓글 수 (작성자 중복 제거 후)
    pub const PAGE_SIZE: usize = 100;

    /// 응답에 담기는 댓글 본문 최대 글자 수 (말줄임표 없음)
    pub const COMMENT_PREVIEW_CHARS: usize = 50;
}

/// 저장소 스키마 상수들
pub mod storage {
    /// 댓글 테이블
    pub const COMMENTS_TABLE: &str = "youtube_comments";

    /// 요청 감사 로그 테이블
    pub const REQUEST_LOG_TABLE: &str = "api_request_logs";

    /// 존재해야 하는 테이블 목록
    pub const REQUIRED_TABLES: [&str; 2] = [REQUEST_LOG_TABLE, COMMENTS_TABLE];

    /// 컬럼 길이 제한
    pub const MAX_VIDEO_ID_CHARS: usize = 64;
    pub const MAX_COMMENT_ID_CHARS: usize = 128;
    pub const MAX_AUTHOR_CHANNEL_ID_CHARS: usize = 128;
    pub const MAX_AUTHOR_DISPLAY_NAME_CHARS: usize = 256;
    pub const MAX_AUTHOR_CHANNEL_URL_CHARS: usize = 512;
}
