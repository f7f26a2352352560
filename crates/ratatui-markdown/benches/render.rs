use criterion::Criterion;
use criterion::black_box;
use criterion::criterion_group;
use criterion::criterion_main;
use ratatui_markdown::MarkdownDocument;
use ratatui_markdown::MarkdownOptions;
use ratatui_markdown::MarkdownView;
use ratatui_markdown::layout::LayoutContext;

fn sample_markdown(sections: usize) -> String {
    let mut s = String::new();
    s.push_str("# Performance\n\n");
    for n in 0..sections {
        s.push_str(&format!("## Section {n}\n\n"));
        s.push_str("This is a long paragraph to stress wrapping, with **bold**, *italic*, ");
        s.push_str("`code`, a [reference][docs] and a bare https://example.com/path URL. ");
        for _ in 0..6 {
            s.push_str("The quick brown fox jumps over the lazy dog. ");
        }
        s.push_str("\n\n");

        s.push_str("- [x] task list item\n");
        s.push_str("- [ ] task list item\n");
        s.push_str("  1. nested ordered\n");
        s.push_str("  2. nested ordered\n\n");

        s.push_str("> quoted text with &amp; entities and \\* escapes\n\n");

        s.push_str("| Name | Value | Notes |\n");
        s.push_str("|:-----|------:|:------|\n");
        s.push_str("| foo  | 123   | left / right alignment |\n");
        s.push_str("| bar  | 456   | a cell that will need an ellipsis |\n\n");

        s.push_str("```rs\nfn main() {\n    println!(\"done\");\n}\n```\n\n");
    }
    s.push_str("[docs]: https://docs.rs\n");
    s
}

fn bench_parse(c: &mut Criterion) {
    let options = MarkdownOptions::default();
    let md = sample_markdown(50);
    c.bench_function("markdown/parse", |b| {
        b.iter(|| {
            let doc = MarkdownDocument::parse(black_box(md.as_str()), &options);
            black_box(doc.is_ok());
        })
    });
}

fn bench_render_and_layout(c: &mut Criterion) {
    let options = MarkdownOptions::default();
    let md = sample_markdown(50);
    let Ok(doc) = MarkdownDocument::parse(md.as_str(), &options) else {
        return;
    };
    c.bench_function("markdown/render", |b| {
        b.iter(|| {
            let rendered = doc.render(black_box(&options));
            black_box(rendered.elements.len());
        })
    });

    let rendered = doc.render(&options);
    let ctx = LayoutContext::from_options(&options);
    c.bench_function("markdown/layout/96", |b| {
        b.iter(|| {
            let lines = rendered.layout(black_box(96), &options.typography, &ctx);
            black_box(lines.len());
        })
    });
}

fn bench_view(c: &mut Criterion) {
    let md = sample_markdown(50);
    c.bench_function("markdown_view/set_markdown+layout", |b| {
        b.iter(|| {
            let mut view = MarkdownView::new();
            view.set_markdown(black_box(&md));
            let lines = view.lines_for_width(black_box(96));
            black_box(lines.len());
        })
    });
}

criterion_group!(benches, bench_parse, bench_render_and_layout, bench_view);
criterion_main!(benches);
